use crate::filter::FilterOperator;
use crate::hash_join::HashJoinOperator;
use crate::merge_join::MergeJoinOperator;
use crate::operator::BoxedOperator;
use crate::scan::ScanOperator;
use crate::sort::SortOperator;
use rdf_bucket_common::{AtomDictionary, EngineResult, MetricsSink, NoopMetrics};
use rdf_bucket_encoding::{binding_set_len, tuple_len};
use rdf_bucket_logical::{PlanNode, PlanOperator, QueryPlan};
use rdf_bucket_storage::{Index, TempSpace, TripleBuckets};
use std::sync::Arc;

/// The default number of records an operator buffers in memory regardless of its memory budget.
pub const MIN_BUFFERED_RECORDS: usize = 64;

/// Translates [QueryPlan]s into trees of physical operators.
///
/// The memory budget of a plan operator is converted into a number of records using the size of
/// its records: `4 + 16 × variables` bytes for binding sets and `8 × variables` bytes for the
/// tuples of a sort. Every operator buffers at least [MIN_BUFFERED_RECORDS] records unless
/// configured otherwise with [OperatorBuilder::with_min_buffered_records].
#[derive(Debug, Clone)]
pub struct OperatorBuilder {
    buckets: Arc<TripleBuckets>,
    index: Arc<Index>,
    dictionary: Arc<dyn AtomDictionary>,
    temp: Arc<TempSpace>,
    metrics: Arc<dyn MetricsSink>,
    min_buffered_records: usize,
}

impl OperatorBuilder {
    pub fn new(
        buckets: Arc<TripleBuckets>,
        index: Arc<Index>,
        dictionary: Arc<dyn AtomDictionary>,
        temp: Arc<TempSpace>,
    ) -> Self {
        Self {
            buckets,
            index,
            dictionary,
            temp,
            metrics: Arc::new(NoopMetrics),
            min_buffered_records: MIN_BUFFERED_RECORDS,
        }
    }

    /// Reports the metrics of all built operators to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Lowers the number of records an operator buffers regardless of its budget. At least one
    /// record is always buffered.
    #[must_use]
    pub fn with_min_buffered_records(mut self, records: usize) -> Self {
        self.min_buffered_records = records.max(1);
        self
    }

    pub fn build(&self, plan: &QueryPlan) -> EngineResult<BoxedOperator> {
        self.build_operator(plan.root())
    }

    /// Builds the operator tree below `operator`, inputs first.
    pub fn build_operator(&self, operator: &PlanOperator) -> EngineResult<BoxedOperator> {
        let budget = operator.memory_budget as usize;
        Ok(match &operator.node {
            PlanNode::Scan { pattern, order } => Box::new(ScanOperator::try_new(
                &self.buckets,
                &self.index,
                *pattern,
                *order,
                Arc::clone(&self.metrics),
            )?),
            PlanNode::Sort { input, sort_order } => Box::new(SortOperator::try_new(
                self.build_operator(input)?,
                sort_order.clone(),
                self.records_within(budget, tuple_len(sort_order.len())),
                &self.temp,
                Arc::clone(&self.metrics),
            )?),
            PlanNode::Filter { input, filters } => Box::new(FilterOperator::try_new(
                self.build_operator(input)?,
                filters.clone(),
                Arc::clone(&self.dictionary),
                Arc::clone(&self.metrics),
            )?),
            PlanNode::MergeJoin {
                left,
                right,
                join_variables,
            } => Box::new(MergeJoinOperator::try_new(
                self.build_operator(left)?,
                self.build_operator(right)?,
                join_variables.clone(),
                self.records_within(budget, binding_set_len(left.variables().len())),
                Arc::clone(&self.temp),
                Arc::clone(&self.metrics),
            )?),
            PlanNode::HashJoin {
                left,
                right,
                join_variables,
            } => {
                let record_len =
                    binding_set_len(left.variables().len().max(right.variables().len()));
                Box::new(HashJoinOperator::try_new(
                    self.build_operator(left)?,
                    self.build_operator(right)?,
                    join_variables.clone(),
                    self.records_within(budget / 2, record_len),
                    Arc::clone(&self.temp),
                    Arc::clone(&self.metrics),
                )?)
            }
        })
    }

    fn records_within(&self, budget: usize, record_len: usize) -> usize {
        (budget / record_len.max(1)).max(self.min_buffered_records)
    }
}
