use crate::io::{read_i64, read_record};
use rdf_bucket_common::{CorruptionError, EngineResult};
use rdf_bucket_model::{Atom, Binding, BindingSet, Variable};
use std::io::{Read, Write};

/// The size of the binding count that prefixes an encoded binding set.
pub const BINDING_COUNT_LEN: usize = 4;

/// The size of one encoded `(variable, atom)` pair.
pub const BINDING_LEN: usize = 16;

/// Returns the encoded size of a binding set with `bindings` entries.
pub fn binding_set_len(bindings: usize) -> usize {
    BINDING_COUNT_LEN + bindings * BINDING_LEN
}

/// Appends the encoding of `bindings` to `buffer`: an `i32` count followed by
/// `count × (i64 variable, i64 atom)`.
pub fn encode_binding_set(bindings: &BindingSet, buffer: &mut Vec<u8>) -> EngineResult<()> {
    let count = i32::try_from(bindings.len())
        .map_err(|_| CorruptionError::msg("Binding set exceeds i32::MAX entries."))?;
    buffer.reserve(binding_set_len(bindings.len()));
    buffer.extend_from_slice(&count.to_le_bytes());
    for binding in bindings.iter() {
        buffer.extend_from_slice(&binding.variable.0.to_le_bytes());
        buffer.extend_from_slice(&binding.atom.0.to_le_bytes());
    }
    Ok(())
}

/// Decodes a binding set from exactly `bytes`.
pub fn decode_binding_set(bytes: &[u8]) -> EngineResult<BindingSet> {
    if bytes.len() < BINDING_COUNT_LEN {
        return Err(CorruptionError::msg("Binding set is missing its count.").into());
    }
    let count = decode_count(&bytes[..BINDING_COUNT_LEN])?;
    if bytes.len() != binding_set_len(count) {
        return Err(CorruptionError::msg(format!(
            "Binding set with {count} entries has {} bytes.",
            bytes.len()
        ))
        .into());
    }
    Ok(decode_pairs(&bytes[BINDING_COUNT_LEN..], count))
}

/// Writes one binding set to `writer` and returns the number of bytes written.
pub fn write_binding_set<W: Write>(writer: &mut W, bindings: &BindingSet) -> EngineResult<u64> {
    let mut buffer = Vec::new();
    encode_binding_set(bindings, &mut buffer)?;
    writer.write_all(&buffer)?;
    Ok(buffer.len() as u64)
}

/// Reads the next binding set from `reader`.
///
/// Returns `Ok(None)` at the end of the stream.
pub fn read_binding_set<R: Read>(reader: &mut R) -> EngineResult<Option<BindingSet>> {
    let mut count = [0u8; BINDING_COUNT_LEN];
    if !read_record(reader, &mut count)? {
        return Ok(None);
    }
    let count = decode_count(&count)?;

    let mut pairs = vec![0u8; count * BINDING_LEN];
    if count > 0 && !read_record(reader, &mut pairs)? {
        return Err(CorruptionError::msg("Binding set ended after its count.").into());
    }
    Ok(Some(decode_pairs(&pairs, count)))
}

fn decode_count(bytes: &[u8]) -> EngineResult<usize> {
    let mut buffer = [0u8; BINDING_COUNT_LEN];
    buffer.copy_from_slice(bytes);
    let count = i32::from_le_bytes(buffer);
    usize::try_from(count)
        .map_err(|_| CorruptionError::msg(format!("Negative binding count {count}.")).into())
}

fn decode_pairs(bytes: &[u8], count: usize) -> BindingSet {
    let mut result = BindingSet::with_capacity(count);
    for i in 0..count {
        let binding = Binding::new(
            Variable(read_i64(bytes, 2 * i)),
            Atom(read_i64(bytes, 2 * i + 1)),
        );
        result.insert(binding.variable, binding.atom);
    }
    result
}
