use crate::operator::{exhausted, key_of, BoxedOperator, PhysicalOperator};
use rdf_bucket_common::{EngineError, EngineResult, MetricEvent, MetricsSink};
use rdf_bucket_model::{Atom, BindingSet, Variable};
use rdf_bucket_storage::{BindingBuffer, TempSpace};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug)]
enum MergeState {
    /// Skips the input with the smaller key until both keys are equal.
    Advance,
    /// Buffers the block of left results with `key`.
    BlockRead { key: Vec<Atom> },
    /// Replays the buffered block against `right`, one right result after the other.
    BlockRepeat { key: Vec<Atom>, right: BindingSet },
    Done,
}

/// Joins two inputs that are sorted by the join variables.
///
/// The left results sharing a key are buffered in a [BindingBuffer] and replayed for every right
/// result with the same key. Variables that both inputs bind but that are not part of the join
/// variables are compared when merging.
#[derive(Debug)]
pub struct MergeJoinOperator {
    left: BoxedOperator,
    right: BoxedOperator,
    join_variables: Vec<Variable>,
    buffer: BindingBuffer,
    state: MergeState,
    current: Option<BindingSet>,
    reported_spills: u64,
    metrics: Arc<dyn MetricsSink>,
}

impl MergeJoinOperator {
    /// Joins `left` and `right`, keeping at most `buffered_records` left results in memory.
    pub fn try_new(
        left: BoxedOperator,
        right: BoxedOperator,
        join_variables: Vec<Variable>,
        buffered_records: usize,
        temp: Arc<TempSpace>,
        metrics: Arc<dyn MetricsSink>,
    ) -> EngineResult<Self> {
        if join_variables.is_empty() {
            return Err(EngineError::configuration(
                "A merge join needs at least one join variable.",
            ));
        }
        for input in [&left, &right] {
            if !input.sort_order().starts_with(&join_variables) {
                return Err(EngineError::configuration(format!(
                    "The {} input of a merge join is not sorted by the join variables.",
                    input.name()
                )));
            }
        }

        let mut join = Self {
            left,
            right,
            join_variables,
            buffer: BindingBuffer::new(buffered_records, temp)?,
            state: MergeState::Advance,
            current: None,
            reported_spills: 0,
            metrics,
        };
        join.current = join.advance()?;
        Ok(join)
    }

    fn advance(&mut self) -> EngineResult<Option<BindingSet>> {
        loop {
            match std::mem::replace(&mut self.state, MergeState::Done) {
                MergeState::Advance => {
                    let (Some(left), Some(right)) = (self.left.peek(), self.right.peek()) else {
                        return Ok(None);
                    };
                    let left_key = key_of(left, &self.join_variables)?;
                    let right_key = key_of(right, &self.join_variables)?;
                    self.state = MergeState::Advance;
                    match left_key.cmp(&right_key) {
                        Ordering::Less => {
                            self.left.next()?;
                        }
                        Ordering::Greater => {
                            self.right.next()?;
                        }
                        Ordering::Equal => self.state = MergeState::BlockRead { key: left_key },
                    }
                }
                MergeState::BlockRead { key } => {
                    self.buffer.clear();
                    self.buffer.set_jumpback();
                    while self.left_key_equals(&key)? {
                        let left = self.left.next()?;
                        self.buffer.add(left)?;
                    }
                    self.report_spills();
                    let right = self.right.next()?;
                    self.state = MergeState::BlockRepeat { key, right };
                }
                MergeState::BlockRepeat { key, right } => {
                    while self.buffer.has_next() {
                        let left = self.buffer.next()?;
                        if let Some(merged) = left.merge(&right) {
                            self.state = MergeState::BlockRepeat { key, right };
                            return Ok(Some(merged));
                        }
                    }

                    let next_right = match self.right.peek() {
                        Some(next) => key_of(next, &self.join_variables)? == key,
                        None => false,
                    };
                    if next_right {
                        let right = self.right.next()?;
                        self.buffer.jumpback();
                        self.state = MergeState::BlockRepeat { key, right };
                    } else {
                        self.state = MergeState::Advance;
                    }
                }
                MergeState::Done => return Ok(None),
            }
        }
    }

    fn report_spills(&mut self) {
        let spilled = self.buffer.spilled();
        if spilled > self.reported_spills {
            self.metrics.record(
                "merge-join",
                MetricEvent::RecordsSpilled(spilled - self.reported_spills),
            );
            self.reported_spills = spilled;
        }
    }

    fn left_key_equals(&self, key: &[Atom]) -> EngineResult<bool> {
        match self.left.peek() {
            Some(left) => Ok(key_of(left, &self.join_variables)? == key),
            None => Ok(false),
        }
    }
}

impl PhysicalOperator for MergeJoinOperator {
    fn name(&self) -> &'static str {
        "merge-join"
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
        &self.join_variables
    }

    fn dispose(&mut self) {
        self.current = None;
        self.state = MergeState::Done;
        self.buffer.clear();
        self.left.dispose();
        self.right.dispose();
    }
}
