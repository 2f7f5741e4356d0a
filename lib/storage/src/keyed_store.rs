use crate::temp::{TempFile, TempSpace};
use rdf_bucket_common::{CorruptionError, EngineError, EngineResult};
use rdf_bucket_encoding::{read_binding_set, read_record, write_binding_set};
use rdf_bucket_model::BindingSet;
use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter, Write};
use std::sync::Arc;

type Entry = (u16, BindingSet);

/// Collects binding sets keyed by a 16-bit hash and returns them ordered by the hash.
///
/// At most `memory_records` binding sets are kept in memory. When the limit is reached, the
/// in-memory entries are written to a temporary file as a sorted run. Iterating merges all runs
/// with the in-memory remainder.
#[derive(Debug)]
pub struct KeyedSpillStore {
    memory_records: usize,
    temp: Arc<TempSpace>,
    memory: BTreeMap<u16, Vec<BindingSet>>,
    in_memory: usize,
    runs: Vec<TempFile>,
    len: u64,
    spilled: u64,
}

impl KeyedSpillStore {
    pub fn new(memory_records: usize, temp: Arc<TempSpace>) -> EngineResult<Self> {
        if memory_records == 0 {
            return Err(EngineError::configuration(
                "A spill store must hold at least one record in memory.",
            ));
        }
        Ok(Self {
            memory_records,
            temp,
            memory: BTreeMap::new(),
            in_memory: 0,
            runs: Vec::new(),
            len: 0,
            spilled: 0,
        })
    }

    pub fn insert(&mut self, hash: u16, bindings: BindingSet) -> EngineResult<()> {
        self.memory.entry(hash).or_default().push(bindings);
        self.in_memory += 1;
        self.len += 1;
        if self.in_memory >= self.memory_records {
            self.spill()?;
        }
        Ok(())
    }

    /// The number of inserted binding sets.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of binding sets that have been written to temporary files.
    pub fn spilled(&self) -> u64 {
        self.spilled
    }

    /// Consumes the store and returns its entries in ascending hash order. Entries with the
    /// same hash keep their insertion order.
    pub fn into_sorted(self) -> EngineResult<KeyedSpillIter> {
        let mut sources = Vec::with_capacity(self.runs.len() + 1);
        for run in &self.runs {
            let mut reader = BufReader::new(run.open()?);
            let entries = std::iter::from_fn(move || read_entry(&mut reader).transpose());
            sources.push(Source::new(Box::new(entries))?);
        }
        let memory = self
            .memory
            .into_iter()
            .flat_map(|(hash, values)| {
                values
                    .into_iter()
                    .map(move |value| Ok::<_, EngineError>((hash, value)))
            });
        sources.push(Source::new(Box::new(memory))?);

        Ok(KeyedSpillIter {
            sources,
            _runs: self.runs,
        })
    }

    fn spill(&mut self) -> EngineResult<()> {
        let run = self.temp.allocate("hash-run")?;
        let mut writer = BufWriter::new(run.append()?);
        for (hash, values) in std::mem::take(&mut self.memory) {
            for value in values {
                writer.write_all(&hash.to_le_bytes())?;
                write_binding_set(&mut writer, &value)?;
            }
        }
        writer.flush()?;

        tracing::trace!("Spilled {} binding sets into a hash run", self.in_memory);
        self.spilled += self.in_memory as u64;
        self.in_memory = 0;
        self.runs.push(run);
        Ok(())
    }
}

fn read_entry<R: std::io::Read>(reader: &mut R) -> EngineResult<Option<Entry>> {
    let mut hash = [0u8; 2];
    if !read_record(reader, &mut hash)? {
        return Ok(None);
    }
    let bindings = read_binding_set(reader)?
        .ok_or_else(|| CorruptionError::msg("Hash run ended after a hash."))?;
    Ok(Some((u16::from_le_bytes(hash), bindings)))
}

struct Source {
    entries: Box<dyn Iterator<Item = EngineResult<Entry>> + Send>,
    current: Option<Entry>,
}

impl Source {
    fn new(
        mut entries: Box<dyn Iterator<Item = EngineResult<Entry>> + Send>,
    ) -> EngineResult<Self> {
        let current = entries.next().transpose()?;
        Ok(Self { entries, current })
    }

    fn hash(&self) -> Option<u16> {
        self.current.as_ref().map(|(hash, _)| *hash)
    }
}

/// The merged entries of a [KeyedSpillStore].
pub struct KeyedSpillIter {
    sources: Vec<Source>,
    _runs: Vec<TempFile>,
}

impl KeyedSpillIter {
    /// Returns the hash of the next entry.
    pub fn peek_hash(&self) -> Option<u16> {
        self.sources.iter().filter_map(Source::hash).min()
    }

    fn min_source(&self) -> Option<usize> {
        let mut min: Option<(usize, u16)> = None;
        for (i, source) in self.sources.iter().enumerate() {
            if let Some(hash) = source.hash() {
                match min {
                    Some((_, min_hash)) if min_hash <= hash => {}
                    _ => min = Some((i, hash)),
                }
            }
        }
        min.map(|(i, _)| i)
    }
}

impl Iterator for KeyedSpillIter {
    type Item = EngineResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.min_source()?;
        let source = &mut self.sources[index];
        let entry = source.current.take()?;
        match source.entries.next().transpose() {
            Ok(next) => source.current = next,
            Err(error) => return Some(Err(error)),
        }
        Some(Ok(entry))
    }
}

impl std::fmt::Debug for KeyedSpillIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedSpillIter")
            .field("sources", &self.sources.len())
            .field("next_hash", &self.peek_hash())
            .finish()
    }
}
