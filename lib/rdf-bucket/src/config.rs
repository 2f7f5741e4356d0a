//! The configuration of a [Database](crate::database::Database).

use rdf_bucket_common::{EngineError, EngineResult};
use rdf_bucket_logical::{PlannerConfig, TieBreak, DEFAULT_MEMORY_BUDGET};
use rdf_bucket_physical::MIN_BUFFERED_RECORDS;
use std::path::PathBuf;

/// The default number of triples the bulk load sorts in memory.
pub const DEFAULT_SORT_MEMORY_RECORDS: usize = 1 << 20;

/// Configures how a [Database](crate::database::Database) stores and queries its triples.
///
/// ```
/// use rdf_bucket::config::DatabaseConfig;
/// use rdf_bucket::logical::TieBreak;
///
/// let config = DatabaseConfig::default()
///     .with_memory_budget(1 << 20)
///     .with_tie_break(TieBreak::First)
///     .with_mini_buckets(true);
/// assert_eq!(config.planner_config().memory_budget, 1 << 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// The directory of the bucket files. `None` creates a private directory that is removed
    /// together with the database.
    pub directory: Option<PathBuf>,
    /// The directory of the files operators spill into. `None` creates a private directory.
    pub temp_directory: Option<PathBuf>,
    /// The number of bytes the planner distributes over the operators of a query.
    pub memory_budget: u64,
    /// The number of triples the bulk load sorts in memory.
    pub sort_memory_records: usize,
    /// Compacts the POS and OSP buckets into mini buckets after indexing.
    pub mini_buckets: bool,
    /// Seeds temp file names and the random tie break.
    pub random_seed: Option<u64>,
    pub tie_break: TieBreak,
    /// Sorts join inputs that cannot be merge-joined directly instead of hash-joining them.
    pub sort_merge_joins: bool,
    /// The number of records every operator buffers in memory, whatever its share of the
    /// memory budget.
    pub min_buffered_records: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            directory: None,
            temp_directory: None,
            memory_budget: DEFAULT_MEMORY_BUDGET,
            sort_memory_records: DEFAULT_SORT_MEMORY_RECORDS,
            mini_buckets: false,
            random_seed: None,
            tie_break: TieBreak::default(),
            sort_merge_joins: false,
            min_buffered_records: MIN_BUFFERED_RECORDS,
        }
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    #[must_use]
    pub fn with_temp_directory(mut self, temp_directory: impl Into<PathBuf>) -> Self {
        self.temp_directory = Some(temp_directory.into());
        self
    }

    #[must_use]
    pub fn with_memory_budget(mut self, memory_budget: u64) -> Self {
        self.memory_budget = memory_budget;
        self
    }

    #[must_use]
    pub fn with_sort_memory_records(mut self, sort_memory_records: usize) -> Self {
        self.sort_memory_records = sort_memory_records;
        self
    }

    #[must_use]
    pub fn with_mini_buckets(mut self, mini_buckets: bool) -> Self {
        self.mini_buckets = mini_buckets;
        self
    }

    #[must_use]
    pub fn with_random_seed(mut self, random_seed: u64) -> Self {
        self.random_seed = Some(random_seed);
        self
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    #[must_use]
    pub fn with_sort_merge_joins(mut self, sort_merge_joins: bool) -> Self {
        self.sort_merge_joins = sort_merge_joins;
        self
    }

    #[must_use]
    pub fn with_min_buffered_records(mut self, min_buffered_records: usize) -> Self {
        self.min_buffered_records = min_buffered_records;
        self
    }

    /// Returns the part of the configuration that drives the planner.
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig::default()
            .with_memory_budget(self.memory_budget)
            .with_tie_break(self.tie_break)
            .with_sort_merge_joins(self.sort_merge_joins)
            .with_random_seed(self.random_seed)
    }

    pub(crate) fn validate(&self) -> EngineResult<()> {
        if self.memory_budget == 0 {
            return Err(EngineError::configuration(
                "The memory budget must be positive.",
            ));
        }
        if self.sort_memory_records == 0 {
            return Err(EngineError::configuration(
                "The bulk load must sort at least one triple in memory.",
            ));
        }
        if self.min_buffered_records == 0 {
            return Err(EngineError::configuration(
                "Operators must buffer at least one record in memory.",
            ));
        }
        Ok(())
    }
}
