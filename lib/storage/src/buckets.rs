use crate::bucket::{Bucket, BucketFormat};
use crate::sort::{sort_bucket, SortOutcome};
use crate::temp::TempSpace;
use rdf_bucket_common::{EngineError, EngineResult};
use rdf_bucket_model::{BucketOrder, EncodedTriple, TriplePattern};
use std::path::Path;

/// Represents the three bucket permutations (SPO, POS and OSP) of the stored triples.
///
/// Different triple patterns require different sort orders. For example, the pattern
/// `a1 a2 ?o` is best served by the SPO bucket: the index locates the range of `a1` and the scan
/// reads the records of `a2` from it. The pattern `?s a2 a3`, however, cannot be evaluated
/// efficiently with the SPO bucket and is read from the POS bucket instead.
#[derive(Debug)]
pub struct TripleBuckets {
    buckets: Vec<Bucket>,
}

impl TripleBuckets {
    /// Creates three empty full buckets in `directory`.
    pub fn create(directory: &Path) -> EngineResult<Self> {
        let buckets = BucketOrder::ALL
            .into_iter()
            .map(|order| {
                Bucket::create(directory.join(file_name(order, BucketFormat::Full)), order)
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { buckets })
    }

    /// Creates a [TripleBuckets] from existing buckets.
    pub fn new(buckets: Vec<Bucket>) -> EngineResult<Self> {
        for order in BucketOrder::ALL {
            let count = buckets.iter().filter(|b| b.order() == order).count();
            if count != 1 {
                return Err(EngineError::configuration(format!(
                    "Expected exactly one {order} bucket, found {count}."
                )));
            }
        }
        Ok(Self { buckets })
    }

    /// Finds the bucket sorted by `order`.
    pub fn find_bucket(&self, order: BucketOrder) -> Option<&Bucket> {
        self.buckets.iter().find(|bucket| bucket.order() == order)
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Chooses the bucket for scanning `pattern`.
    pub fn choose_bucket(&self, pattern: &TriplePattern) -> BucketOrder {
        self.buckets
            .iter()
            .rev() // Prefer SPO (max by uses the last on equality)
            .max_by_key(|bucket| pattern.scan_score(bucket.order()))
            .map(Bucket::order)
            .unwrap_or(BucketOrder::SPO)
    }

    /// Returns the number of stored triples.
    pub fn len(&self) -> EngineResult<u64> {
        match self.find_bucket(BucketOrder::SPO) {
            Some(bucket) => bucket.len(),
            None => Ok(0),
        }
    }

    pub fn is_empty(&self) -> EngineResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Appends `triples` to every bucket. The buckets must be sorted afterward.
    pub fn insert(&self, triples: &[EncodedTriple]) -> EngineResult<u64> {
        let mut count = 0;
        for bucket in &self.buckets {
            let mut writer = bucket.writer()?;
            for triple in triples {
                writer.append(triple)?;
            }
            count = writer.finish()?;
        }
        Ok(count)
    }

    /// Sorts every bucket by its order with the external sort.
    pub fn sort(&self, max_records_in_memory: usize, temp: &TempSpace) -> EngineResult<()> {
        for bucket in &self.buckets {
            let SortOutcome { records, chunks } =
                sort_bucket(bucket, max_records_in_memory, temp)?;
            tracing::debug!(
                "Sorted bucket {} ({records} records, {chunks} chunks)",
                bucket.order()
            );
        }
        Ok(())
    }

    /// Replaces the buckets of `orders` with mini buckets written next to them.
    ///
    /// The full bucket files are removed afterward.
    pub fn compact_to_mini(&mut self, orders: &[BucketOrder]) -> EngineResult<()> {
        for bucket in &mut self.buckets {
            if !orders.contains(&bucket.order()) || bucket.format() == BucketFormat::Mini {
                continue;
            }
            let directory = bucket.path().parent().unwrap_or_else(|| Path::new("."));
            let mini_path = directory.join(file_name(bucket.order(), BucketFormat::Mini));
            let mini = bucket.compact_to_mini(mini_path)?;
            std::fs::remove_file(bucket.path())?;
            *bucket = mini;
        }
        Ok(())
    }
}

fn file_name(order: BucketOrder, format: BucketFormat) -> String {
    let order = order.to_string().to_lowercase();
    match format {
        BucketFormat::Full => format!("{order}.bucket"),
        BucketFormat::Mini => format!("{order}.mini.bucket"),
    }
}
