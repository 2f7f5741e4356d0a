use crate::buckets::TripleBuckets;
use crate::TripleCursor;
use rdf_bucket_common::{CorruptionError, EngineResult, KeyValueStore, NotFoundError};
use rdf_bucket_encoding::{decode_payload, encode_payload};
use rdf_bucket_model::{Atom, BucketOrder, EncodedTriple, IndexPayload};
use std::sync::Arc;

const INDEX_PREFIX: u8 = b'i';

/// Maps every atom to its record ranges in the three buckets.
///
/// The payloads live in a [KeyValueStore] under the key `b'i'` followed by the atom id in an
/// order-preserving big-endian form, such that a prefix scan yields the atoms in ascending
/// order.
#[derive(Debug, Clone)]
pub struct Index {
    store: Arc<dyn KeyValueStore>,
}

impl Index {
    /// Opens an index that has already been built into `store`.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Builds the index of the sorted full `buckets` into `store`.
    ///
    /// The three buckets are traversed in one synchronized pass. In each step, the smallest
    /// primary atom across the buckets is determined and the run of records with this atom is
    /// consumed from every bucket that starts with it.
    pub fn build(buckets: &TripleBuckets, store: Arc<dyn KeyValueStore>) -> EngineResult<Self> {
        let mut runs = BucketOrder::ALL
            .into_iter()
            .map(|order| {
                let bucket = buckets.find_bucket(order).ok_or_else(|| {
                    CorruptionError::msg(format!("The {order} bucket is missing."))
                })?;
                RunReader::new(order, bucket.cursor()?)
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let mut atoms = 0u64;
        while let Some(atom) = runs.iter().filter_map(RunReader::current_primary).min() {
            let mut payload = IndexPayload::ABSENT;
            for run in &mut runs {
                if run.current_primary() != Some(atom) {
                    continue;
                }
                let (start, count) = run.consume(atom)?;
                payload.set(run.order.primary(), to_i64(start)?, to_i64(count)?);
            }
            store.put(&index_key(atom), &encode_payload(&payload));
            atoms += 1;
        }

        tracing::debug!("Built index with {atoms} atoms");
        Ok(Self { store })
    }

    /// Returns the payload of `atom`.
    pub fn payload(&self, atom: Atom) -> EngineResult<IndexPayload> {
        match self.store.get(&index_key(atom)) {
            Some(bytes) => decode_payload(&bytes),
            None => Err(NotFoundError::IndexPayload(atom).into()),
        }
    }

    pub fn contains(&self, atom: Atom) -> bool {
        self.store.exists(&index_key(atom))
    }

    /// Iterates over all `(atom, payload)` entries in ascending atom order.
    pub fn cursor(&self) -> IndexCursor {
        IndexCursor {
            entries: self.store.scan_prefix(&[INDEX_PREFIX]).into_iter(),
        }
    }

    /// The store that holds the index.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }
}

/// Iterates over the entries of an [Index].
#[derive(Debug)]
pub struct IndexCursor {
    entries: std::vec::IntoIter<(Vec<u8>, Vec<u8>)>,
}

impl Iterator for IndexCursor {
    type Item = EngineResult<(Atom, IndexPayload)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.entries.next()?;
        Some(atom_of_key(&key).and_then(|atom| Ok((atom, decode_payload(&value)?))))
    }
}

/// Flips the sign bit so that the big-endian bytes sort like the signed ids.
fn index_key(atom: Atom) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = INDEX_PREFIX;
    key[1..].copy_from_slice(&((atom.0 as u64) ^ (1 << 63)).to_be_bytes());
    key
}

fn atom_of_key(key: &[u8]) -> EngineResult<Atom> {
    let bytes: [u8; 8] = key
        .get(1..)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| CorruptionError::msg(format!("Invalid index key of {} bytes.", key.len())))?;
    Ok(Atom((u64::from_be_bytes(bytes) ^ (1 << 63)) as i64))
}

fn to_i64(value: u64) -> EngineResult<i64> {
    i64::try_from(value)
        .map_err(|_| CorruptionError::msg(format!("Offset {value} exceeds i64::MAX.")).into())
}

/// Reads a sorted bucket run by run.
struct RunReader {
    order: BucketOrder,
    cursor: TripleCursor,
    current: Option<EncodedTriple>,
    /// Offset of `current` in the bucket.
    offset: u64,
}

impl RunReader {
    fn new(order: BucketOrder, mut cursor: TripleCursor) -> EngineResult<Self> {
        let current = cursor.next().transpose()?;
        Ok(Self {
            order,
            cursor,
            current,
            offset: 0,
        })
    }

    fn current_primary(&self) -> Option<Atom> {
        self.current.map(|triple| triple.get(self.order.primary()))
    }

    /// Consumes all records with `atom` as primary value and returns their range.
    fn consume(&mut self, atom: Atom) -> EngineResult<(u64, u64)> {
        let start = self.offset;
        while self.current_primary() == Some(atom) {
            self.current = self.cursor.next().transpose()?;
            self.offset += 1;
        }
        if let Some(next) = self.current_primary() {
            if next < atom {
                return Err(CorruptionError::msg(format!(
                    "The {} bucket is not sorted: {next} follows {atom}.",
                    self.order
                ))
                .into());
            }
        }
        Ok((start, self.offset - start))
    }
}
