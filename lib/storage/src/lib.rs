//! The on-disk side of the engine.
//!
//! Triples are kept in three sorted bucket files (SPO, POS and OSP). An index maps every atom to
//! its record range in each bucket and the statistics summarize the distribution of atoms over
//! the positions. Operators that need more memory than their budget spill into files of the
//! [TempSpace].

mod binding_buffer;
mod bucket;
mod buckets;
mod index;
mod keyed_store;
mod sort;
mod statistics;
mod temp;

pub use binding_buffer::BindingBuffer;
pub use bucket::{Bucket, BucketFormat, BucketWriter, TripleCursor};
pub use buckets::TripleBuckets;
pub use index::{Index, IndexCursor};
pub use keyed_store::{KeyedSpillIter, KeyedSpillStore};
pub use sort::{sort_bucket, sort_file, RecordLayout, SortOutcome};
pub use statistics::Statistics;
pub use temp::{TempFile, TempSpace};
