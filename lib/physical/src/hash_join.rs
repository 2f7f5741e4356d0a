use crate::operator::{drain, exhausted, key_of, BoxedOperator, PhysicalOperator};
use rdf_bucket_common::{EngineResult, MetricEvent, MetricsSink};
use rdf_bucket_model::{Atom, BindingSet, Variable};
use rdf_bucket_storage::{KeyedSpillIter, KeyedSpillStore, TempSpace};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// The 16-bit hash by which the hash join partitions its inputs: the XOR of the join values,
/// folded into 16 bits.
///
/// Different values may share a hash. The join compares the exact values within a hash.
pub fn join_hash(values: &[Atom]) -> u16 {
    let hash = values.iter().fold(0i64, |hash, atom| hash ^ atom.0) as u64;
    (hash ^ (hash >> 16) ^ (hash >> 32) ^ (hash >> 48)) as u16
}

/// Joins two inputs by partitioning both by the [join_hash] of the join variables.
///
/// Both inputs are drained concurrently on construction into stores that are ordered by hash and
/// spill to disk. The probe phase walks both stores in hash order. For every hash, the left
/// results are grouped by their exact join values and every right result is merged with the
/// left results of its values. Without join variables, the join is a cross product.
#[derive(Debug)]
pub struct HashJoinOperator {
    join_variables: Vec<Variable>,
    probe: Option<Probe>,
    pending: VecDeque<BindingSet>,
    current: Option<BindingSet>,
    metrics: Arc<dyn MetricsSink>,
}

#[derive(Debug)]
struct Probe {
    left: KeyedSpillIter,
    right: KeyedSpillIter,
    chunk_hash: Option<u16>,
    chunk: FxHashMap<Vec<Atom>, Vec<BindingSet>>,
}

impl HashJoinOperator {
    /// Joins `left` and `right`. Each input keeps at most `records_per_input` results in memory.
    pub fn try_new(
        left: BoxedOperator,
        right: BoxedOperator,
        join_variables: Vec<Variable>,
        records_per_input: usize,
        temp: Arc<TempSpace>,
        metrics: Arc<dyn MetricsSink>,
    ) -> EngineResult<Self> {
        let (left, right) = std::thread::scope(|scope| {
            let left = scope.spawn(|| {
                partition(left, &join_variables, records_per_input, Arc::clone(&temp))
            });
            let right = scope.spawn(|| {
                partition(right, &join_variables, records_per_input, Arc::clone(&temp))
            });
            (
                left.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                right.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
            )
        });
        let (left, right) = (left?, right?);

        let spilled = left.spilled() + right.spilled();
        if spilled > 0 {
            metrics.record("hash-join", MetricEvent::RecordsSpilled(spilled));
        }
        tracing::trace!(
            "Partitioned {} left and {} right results, {spilled} spilled",
            left.len(),
            right.len()
        );

        let mut join = Self {
            join_variables,
            probe: Some(Probe {
                left: left.into_sorted()?,
                right: right.into_sorted()?,
                chunk_hash: None,
                chunk: FxHashMap::default(),
            }),
            pending: VecDeque::new(),
            current: None,
            metrics,
        };
        join.current = join.advance()?;
        Ok(join)
    }

    fn advance(&mut self) -> EngineResult<Option<BindingSet>> {
        loop {
            if let Some(result) = self.pending.pop_front() {
                return Ok(Some(result));
            }
            let Some(probe) = self.probe.as_mut() else {
                return Ok(None);
            };
            let Some(hash) = probe.right.peek_hash() else {
                self.probe = None;
                return Ok(None);
            };

            if probe.chunk_hash != Some(hash) {
                probe.load_chunk(hash, &self.join_variables)?;
                if probe.chunk.is_empty() && probe.left.peek_hash().is_none() {
                    self.probe = None;
                    return Ok(None);
                }
            }

            let Some((_, right)) = probe.right.next().transpose()? else {
                continue;
            };
            let key = key_of(&right, &self.join_variables)?;
            if let Some(lefts) = probe.chunk.get(&key) {
                self.pending
                    .extend(lefts.iter().filter_map(|left| left.merge(&right)));
            }
        }
    }
}

impl Probe {
    /// Replaces the chunk with the left results of `hash`.
    fn load_chunk(&mut self, hash: u16, join_variables: &[Variable]) -> EngineResult<()> {
        self.chunk.clear();
        self.chunk_hash = Some(hash);
        while let Some(left_hash) = self.left.peek_hash() {
            if left_hash > hash {
                break;
            }
            let Some((_, left)) = self.left.next().transpose()? else {
                break;
            };
            if left_hash == hash {
                self.chunk
                    .entry(key_of(&left, join_variables)?)
                    .or_default()
                    .push(left);
            }
        }
        Ok(())
    }
}

/// Drains `input` into a store keyed by the [join_hash] of `join_variables`.
fn partition(
    mut input: BoxedOperator,
    join_variables: &[Variable],
    records_in_memory: usize,
    temp: Arc<TempSpace>,
) -> EngineResult<KeyedSpillStore> {
    let mut store = KeyedSpillStore::new(records_in_memory, temp)?;
    drain(input.as_mut(), |bindings| {
        let hash = join_hash(&key_of(&bindings, join_variables)?);
        store.insert(hash, bindings)
    })?;
    input.dispose();
    Ok(store)
}

impl PhysicalOperator for HashJoinOperator {
    fn name(&self) -> &'static str {
        "hash-join"
    }

    fn peek(&self) -> Option<&BindingSet> {
        self.current.as_ref()
    }

    fn next(&mut self) -> EngineResult<BindingSet> {
        let result = self.current.take().ok_or_else(exhausted)?;
        self.current = self.advance()?;
        self.metrics.record(self.name(), MetricEvent::ResultProduced);
        Ok(result)
    }

    fn sort_order(&self) -> &[Variable] {
        &[]
    }

    fn dispose(&mut self) {
        self.current = None;
        self.pending.clear();
        if self.probe.take().is_some() {
            tracing::trace!("Disposing hash join on {} variables", self.join_variables.len());
        }
    }
}
