//! Contains the physical operators of RDF Bucket.
//!
//! Every operator is a pull-based iterator over [BindingSet](rdf_bucket_model::BindingSet)s that
//! computes its first result eagerly on construction. The [OperatorBuilder] translates a
//! [QueryPlan](rdf_bucket_logical::QueryPlan) into a tree of operators.

mod builder;
mod filter;
mod hash_join;
mod merge_join;
mod operator;
mod scan;
mod sort;

pub use builder::{OperatorBuilder, MIN_BUFFERED_RECORDS};
pub use filter::FilterOperator;
pub use hash_join::{join_hash, HashJoinOperator};
pub use merge_join::MergeJoinOperator;
pub use operator::{BoxedOperator, PhysicalOperator};
pub use scan::ScanOperator;
pub use sort::SortOperator;
