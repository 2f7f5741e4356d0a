use rdf_bucket_common::{CorruptionError, EngineResult};
use std::io::{ErrorKind, Read};

/// Reads the little-endian `i64` in column `column` of `bytes`.
///
/// The caller guarantees that `bytes` holds at least `(column + 1) * 8` bytes.
#[inline]
pub fn read_i64(bytes: &[u8], column: usize) -> i64 {
    let mut buffer = [0u8; 8];
    buffer.copy_from_slice(&bytes[column * 8..(column + 1) * 8]);
    i64::from_le_bytes(buffer)
}

/// Fills `buffer` completely from `reader`.
///
/// Returns `Ok(false)` if the reader was already at its end and a corruption error if the
/// stream ended within the record.
pub fn read_record<R: Read>(reader: &mut R, buffer: &mut [u8]) -> EngineResult<bool> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(error.into()),
        }
    }

    if filled == 0 {
        return Ok(false);
    }
    if filled != buffer.len() {
        return Err(CorruptionError::msg(format!(
            "Stream ended after {filled} bytes of a {}-byte record.",
            buffer.len()
        ))
        .into());
    }
    Ok(true)
}
