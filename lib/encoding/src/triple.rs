use crate::io::read_i64;
use rdf_bucket_common::{CorruptionError, EngineResult};
use rdf_bucket_model::{Atom, EncodedTriple, TriplePosition};

/// The size of a full triple record (`i64 S, i64 P, i64 O`).
pub const TRIPLE_RECORD_LEN: usize = 24;

/// The size of a mini-bucket record, which omits the primary position.
pub const MINI_TRIPLE_RECORD_LEN: usize = 16;

/// Encodes `triple` as a 24-byte record.
pub fn encode_triple(triple: &EncodedTriple) -> [u8; TRIPLE_RECORD_LEN] {
    let mut buffer = [0u8; TRIPLE_RECORD_LEN];
    for (i, atom) in triple.to_array().iter().enumerate() {
        buffer[i * 8..(i + 1) * 8].copy_from_slice(&atom.0.to_le_bytes());
    }
    buffer
}

/// Decodes a 24-byte triple record.
pub fn decode_triple(bytes: &[u8]) -> EngineResult<EncodedTriple> {
    if bytes.len() != TRIPLE_RECORD_LEN {
        return Err(CorruptionError::msg(format!(
            "Triple record has {} bytes instead of {TRIPLE_RECORD_LEN}.",
            bytes.len()
        ))
        .into());
    }

    Ok(EncodedTriple::from_ids(
        read_i64(bytes, 0),
        read_i64(bytes, 1),
        read_i64(bytes, 2),
    ))
}

/// Returns the two positions that a mini-bucket with the given `primary` position stores, in
/// SPO order.
pub fn mini_positions(primary: TriplePosition) -> [TriplePosition; 2] {
    match primary {
        TriplePosition::Subject => [TriplePosition::Predicate, TriplePosition::Object],
        TriplePosition::Predicate => [TriplePosition::Subject, TriplePosition::Object],
        TriplePosition::Object => [TriplePosition::Subject, TriplePosition::Predicate],
    }
}

/// Encodes `triple` as a 16-byte record that omits the `primary` position.
pub fn encode_mini_triple(
    triple: &EncodedTriple,
    primary: TriplePosition,
) -> [u8; MINI_TRIPLE_RECORD_LEN] {
    let mut buffer = [0u8; MINI_TRIPLE_RECORD_LEN];
    for (i, position) in mini_positions(primary).iter().enumerate() {
        buffer[i * 8..(i + 1) * 8].copy_from_slice(&triple.get(*position).0.to_le_bytes());
    }
    buffer
}

/// Decodes a 16-byte mini record. The value of the `primary` position is supplied by the caller
/// (usually from the index range that is being scanned).
pub fn decode_mini_triple(
    bytes: &[u8],
    primary: TriplePosition,
    primary_value: Atom,
) -> EngineResult<EncodedTriple> {
    if bytes.len() != MINI_TRIPLE_RECORD_LEN {
        return Err(CorruptionError::msg(format!(
            "Mini triple record has {} bytes instead of {MINI_TRIPLE_RECORD_LEN}.",
            bytes.len()
        ))
        .into());
    }

    let mut values = [Atom(0); 3];
    values[primary.index()] = primary_value;
    for (i, position) in mini_positions(primary).iter().enumerate() {
        values[position.index()] = Atom(read_i64(bytes, i));
    }
    Ok(EncodedTriple::from_array(values))
}
