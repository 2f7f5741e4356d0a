use crate::io::read_i64;
use rdf_bucket_common::{CorruptionError, EngineResult};
use rdf_bucket_model::Atom;

/// Returns the record size of a tuple with `arity` atoms.
pub fn tuple_len(arity: usize) -> usize {
    arity * 8
}

/// Appends `atoms` as `arity × i64` to `buffer`.
pub fn encode_tuple(atoms: &[Atom], buffer: &mut Vec<u8>) {
    buffer.reserve(tuple_len(atoms.len()));
    for atom in atoms {
        buffer.extend_from_slice(&atom.0.to_le_bytes());
    }
}

/// Decodes a tuple of `arity` atoms.
pub fn decode_tuple(bytes: &[u8], arity: usize) -> EngineResult<Vec<Atom>> {
    if bytes.len() != tuple_len(arity) {
        return Err(CorruptionError::msg(format!(
            "Tuple of arity {arity} has {} bytes.",
            bytes.len()
        ))
        .into());
    }
    Ok((0..arity).map(|i| Atom(read_i64(bytes, i))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_columns() {
        let mut buffer = Vec::new();
        encode_tuple(&[Atom(3), Atom(-4)], &mut buffer);
        assert_eq!(buffer.len(), 16);
        assert_eq!(decode_tuple(&buffer, 2).unwrap(), vec![Atom(3), Atom(-4)]);
        assert!(decode_tuple(&buffer, 3).is_err());
    }
}
