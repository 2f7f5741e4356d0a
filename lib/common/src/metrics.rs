use dashmap::DashMap;
use std::fmt::Debug;

/// An event reported by an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricEvent {
    /// The operator produced one result.
    ResultProduced,
    /// The operator read the given number of records from disk.
    RecordsRead(u64),
    /// The operator wrote the given number of records to temporary files.
    RecordsSpilled(u64),
}

/// Receives execution metrics. The default sink ([NoopMetrics]) ignores everything.
pub trait MetricsSink: Debug + Send + Sync {
    fn record(&self, operator: &'static str, event: MetricEvent);
}

/// A [MetricsSink] that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    #[inline]
    fn record(&self, _operator: &'static str, _event: MetricEvent) {}
}

/// Aggregated counters of one operator type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OperatorCounters {
    pub results: u64,
    pub records_read: u64,
    pub records_spilled: u64,
}

/// A [MetricsSink] that sums up the events per operator name.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    counters: DashMap<&'static str, OperatorCounters>,
}

impl CountingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the counters of `operator`.
    pub fn counters(&self, operator: &str) -> OperatorCounters {
        self.counters
            .get(operator)
            .map(|entry| *entry.value())
            .unwrap_or_default()
    }
}

impl MetricsSink for CountingMetrics {
    fn record(&self, operator: &'static str, event: MetricEvent) {
        let mut counters = self.counters.entry(operator).or_default();
        match event {
            MetricEvent::ResultProduced => counters.results += 1,
            MetricEvent::RecordsRead(n) => counters.records_read += n,
            MetricEvent::RecordsSpilled(n) => counters.records_spilled += n,
        }
    }
}
