use crate::io::read_i64;
use rdf_bucket_common::{CorruptionError, EngineResult};
use rdf_bucket_model::IndexPayload;

/// The size of an encoded [IndexPayload].
pub const INDEX_PAYLOAD_LEN: usize = 48;

/// Encodes the six fields `sStart, sCount, pStart, pCount, oStart, oCount`.
pub fn encode_payload(payload: &IndexPayload) -> [u8; INDEX_PAYLOAD_LEN] {
    let mut buffer = [0u8; INDEX_PAYLOAD_LEN];
    for (i, value) in payload.to_array().iter().enumerate() {
        buffer[i * 8..(i + 1) * 8].copy_from_slice(&value.to_le_bytes());
    }
    buffer
}

/// Decodes a 48-byte payload.
pub fn decode_payload(bytes: &[u8]) -> EngineResult<IndexPayload> {
    if bytes.len() != INDEX_PAYLOAD_LEN {
        return Err(CorruptionError::msg(format!(
            "Index payload has {} bytes instead of {INDEX_PAYLOAD_LEN}.",
            bytes.len()
        ))
        .into());
    }

    let mut values = [0i64; 6];
    for (i, value) in values.iter_mut().enumerate() {
        *value = read_i64(bytes, i);
    }
    Ok(IndexPayload::from_array(values))
}
