//! Shared building blocks of the engine: the error taxonomy, the interfaces of the external
//! collaborators (atom dictionary, key-value persistence, cardinality estimation) together with
//! their in-memory implementations, and the metrics hook.

mod dictionary;
pub mod error;
mod estimator;
mod kv_store;
mod metrics;

pub use dictionary::{AtomDictionary, MemAtomDictionary};
pub use error::{CorruptionError, EngineError, EngineResult, NotFoundError};
pub use estimator::CardinalityEstimator;
pub use kv_store::{KeyValueStore, MemKeyValueStore};
pub use metrics::{CountingMetrics, MetricEvent, MetricsSink, NoopMetrics, OperatorCounters};
