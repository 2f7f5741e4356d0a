use crate::operator::{exhausted, PhysicalOperator};
use rdf_bucket_common::{EngineError, EngineResult, MetricEvent, MetricsSink};
use rdf_bucket_model::{Atom, BindingSet, BucketOrder, EncodedTriple, TriplePattern, Variable};
use rdf_bucket_storage::{Index, TripleBuckets, TripleCursor};
use std::cmp::Ordering;
use std::sync::Arc;

/// Reads the triples matching a pattern from one bucket.
///
/// If the primary position of the bucket holds an atom, only the range of this atom is read.
/// Within the range, the records are sorted by the remaining positions and the scan stops as
/// soon as the leading atoms of the pattern have been passed.
#[derive(Debug)]
pub struct ScanOperator {
    pattern: TriplePattern,
    order: BucketOrder,
    sort_order: Vec<Variable>,
    /// The atoms of the leading positions of the bucket order.
    prefix: Vec<(usize, Atom)>,
    cursor: Option<TripleCursor>,
    current: Option<BindingSet>,
    metrics: Arc<dyn MetricsSink>,
}

impl ScanOperator {
    pub fn try_new(
        buckets: &TripleBuckets,
        index: &Index,
        pattern: TriplePattern,
        order: BucketOrder,
        metrics: Arc<dyn MetricsSink>,
    ) -> EngineResult<Self> {
        let bucket = buckets.find_bucket(order).ok_or_else(|| {
            EngineError::configuration(format!("There is no {order} bucket."))
        })?;

        let primary = order.primary();
        let cursor = match pattern.get(primary).as_atom() {
            Some(atom) => match index.payload(atom)?.range(primary) {
                Some((start, count)) => Some(bucket.range_cursor(start, count, atom)?),
                None => None,
            },
            None => Some(bucket.cursor()?),
        };
        let prefix = order
            .inner()
            .iter()
            .map_while(|position| {
                pattern
                    .get(*position)
                    .as_atom()
                    .map(|atom| (position.index(), atom))
            })
            .collect();

        tracing::trace!("Opening scan of {pattern} on the {order} bucket");
        let mut scan = Self {
            pattern,
            order,
            sort_order: pattern.sort_order(order),
            prefix,
            cursor,
            current: None,
            metrics,
        };
        scan.current = scan.advance()?;
        Ok(scan)
    }

    pub fn pattern(&self) -> &TriplePattern {
        &self.pattern
    }

    pub fn order(&self) -> BucketOrder {
        self.order
    }

    fn advance(&mut self) -> EngineResult<Option<BindingSet>> {
        while let Some(cursor) = self.cursor.as_mut() {
            let Some(triple) = cursor.next().transpose()? else {
                self.cursor = None;
                break;
            };
            self.metrics.record(self.name(), MetricEvent::RecordsRead(1));

            match self.compare_prefix(&triple) {
                Ordering::Less => continue,
                Ordering::Greater => {
                    self.cursor = None;
                    break;
                }
                Ordering::Equal => {}
            }
            if let Some(bindings) = self.pattern.bind(&triple) {
                return Ok(Some(bindings));
            }
        }
        Ok(None)
    }

    /// Compares the leading positions of `triple` with the atoms of the pattern.
    fn compare_prefix(&self, triple: &EncodedTriple) -> Ordering {
        let values = triple.to_array();
        self.prefix
            .iter()
            .map(|(index, atom)| values[*index].cmp(atom))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PhysicalOperator for ScanOperator {
    fn name(&self) -> &'static str {
        "scan"
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
        &self.sort_order
    }

    fn dispose(&mut self) {
        let open = self.cursor.take().is_some();
        if self.current.take().is_some() || open {
            tracing::trace!("Disposing scan of {}", self.pattern);
        }
    }
}
