//! API to bulk load and query an on-disk triple store.
//!
//! The entry point of the module is the [`Database`] struct.
//!
//! Usage example:
//! ```
//! use rdf_bucket::config::DatabaseConfig;
//! use rdf_bucket::database::Database;
//! use rdf_bucket::logical::FilterExpression;
//! use regex::Regex;
//!
//! let triples = [
//!     ("alice", "knows", "bob"),
//!     ("alice", "knows", "carol"),
//!     ("bob", "knows", "carol"),
//! ];
//! let database = Database::create(DatabaseConfig::default().with_random_seed(1), triples)?;
//!
//! // planning and executing a basic graph pattern
//! let query = database
//!     .query_builder()
//!     .pattern("alice", "knows", "?friend")?
//!     .filter("?friend", FilterExpression::Matches(Regex::new("^c")?))?
//!     .build()?;
//! let plan = database.plan(&query)?;
//! let solutions = database
//!     .query(&plan)?
//!     .map(|solution| database.decode(&solution?))
//!     .collect::<Result<Vec<_>, _>>()?;
//! assert_eq!(
//!     solutions,
//!     vec![vec![(query.variable("friend").unwrap(), "carol".to_owned())]]
//! );
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```

use crate::config::DatabaseConfig;
use crate::query::{Query, QueryBuilder};
use rdf_bucket_common::{
    AtomDictionary, CardinalityEstimator, EngineResult, MemAtomDictionary, MemKeyValueStore,
    MetricsSink, NoopMetrics,
};
use rdf_bucket_logical::{PlanGenerator, QueryPlan};
use rdf_bucket_model::{BindingSet, BucketOrder, EncodedTriple, TriplePattern, Variable};
use rdf_bucket_physical::{BoxedOperator, OperatorBuilder};
use rdf_bucket_storage::{Index, Statistics, TempSpace, TripleBuckets};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::TempDir;

/// The number of triples the bulk load collects before appending them to the buckets.
const LOAD_BATCH: usize = 64 * 1024;

/// A read-only triple store that is filled once by a bulk load.
///
/// Queries are planned with the statistics of the loaded triples and evaluated lazily.
///
/// ```
/// use rdf_bucket::config::DatabaseConfig;
/// use rdf_bucket::database::Database;
///
/// let database = Database::create(
///     DatabaseConfig::default().with_mini_buckets(true),
///     [("a", "p", "b"), ("b", "p", "c")],
/// )?;
/// assert_eq!(database.len()?, 2);
/// assert_eq!(database.statistics().total(), 2);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
pub struct Database {
    config: DatabaseConfig,
    dictionary: Arc<MemAtomDictionary>,
    buckets: Arc<TripleBuckets>,
    index: Arc<Index>,
    statistics: Arc<Statistics>,
    temp: Arc<TempSpace>,
    metrics: Arc<dyn MetricsSink>,
    planner: Mutex<PlanGenerator>,
    /// Keeps a private bucket directory alive. Dropped after the buckets.
    owned_directory: Option<TempDir>,
}

impl Database {
    /// Bulk loads the textual `(subject, predicate, object)` triples into a new database.
    ///
    /// The atoms are interned, the triples are written to the three buckets, and every bucket is
    /// sorted externally. Afterward, the index and the statistics are built. Duplicate triples
    /// are stored once per occurrence.
    pub fn create<S, P, O>(
        config: DatabaseConfig,
        triples: impl IntoIterator<Item = (S, P, O)>,
    ) -> EngineResult<Self>
    where
        S: AsRef<str>,
        P: AsRef<str>,
        O: AsRef<str>,
    {
        config.validate()?;
        let (directory, owned) = match &config.directory {
            Some(directory) => {
                fs::create_dir_all(directory)?;
                (directory.clone(), None)
            }
            None => {
                let owned = tempfile::Builder::new().prefix("rdf-bucket-db-").tempdir()?;
                (owned.path().to_path_buf(), Some(owned))
            }
        };
        let temp = Arc::new(match &config.temp_directory {
            Some(temp_directory) => {
                TempSpace::in_directory(temp_directory.clone(), config.random_seed)?
            }
            None => TempSpace::new(config.random_seed)?,
        });

        let dictionary = Arc::new(MemAtomDictionary::new());
        let mut buckets = TripleBuckets::create(&directory)?;
        load(&buckets, dictionary.as_ref(), triples)?;
        buckets.sort(config.sort_memory_records, &temp)?;

        let index = Arc::new(Index::build(
            &buckets,
            Arc::new(MemKeyValueStore::new()),
        )?);
        let statistics = Arc::new(Statistics::build(&index)?);
        if config.mini_buckets {
            buckets.compact_to_mini(&[BucketOrder::POS, BucketOrder::OSP])?;
        }
        tracing::debug!(
            "Created database in {} with {} triples and {} atoms",
            directory.display(),
            statistics.total(),
            dictionary.len()
        );

        let estimator: Arc<dyn CardinalityEstimator + Send + Sync> = statistics.clone();
        let planner = PlanGenerator::new(config.planner_config()).with_estimator(estimator);
        Ok(Self {
            config,
            dictionary,
            buckets: Arc::new(buckets),
            index,
            statistics,
            temp,
            metrics: Arc::new(NoopMetrics),
            planner: Mutex::new(planner),
            owned_directory: owned,
        })
    }

    /// Reports the metrics of all operators of later queries to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Starts a [Query] on the atoms of this database.
    pub fn query_builder(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self.dictionary.as_ref())
    }

    /// Plans the conjunction of `patterns`.
    pub fn get_query_plan(&self, patterns: &[TriplePattern]) -> EngineResult<QueryPlan> {
        self.planner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generate(patterns)
    }

    /// Plans `query`, placing its filters on top of the joins.
    pub fn plan(&self, query: &Query) -> EngineResult<QueryPlan> {
        let plan = self.get_query_plan(query.patterns())?;
        if query.filters().is_empty() {
            return Ok(plan);
        }
        plan.with_filters(query.filters().to_vec())
    }

    /// Builds the operators of `plan`.
    ///
    /// Joins and sorts consume their inputs while they are built, so the first results of a
    /// plan with such operators are only available after this call did most of the work.
    pub fn query(&self, plan: &QueryPlan) -> EngineResult<QuerySolutions> {
        let operator = OperatorBuilder::new(
            Arc::clone(&self.buckets),
            Arc::clone(&self.index),
            self.dictionary.clone(),
            Arc::clone(&self.temp),
        )
        .with_metrics(Arc::clone(&self.metrics))
        .with_min_buffered_records(self.config.min_buffered_records)
        .build(plan)?;
        Ok(QuerySolutions::new(operator))
    }

    /// Plans and evaluates `query`.
    pub fn execute(&self, query: &Query) -> EngineResult<QuerySolutions> {
        self.query(&self.plan(query)?)
    }

    /// Looks up the texts of the atoms in `bindings`.
    pub fn decode(&self, bindings: &BindingSet) -> EngineResult<Vec<(Variable, String)>> {
        bindings
            .iter()
            .map(|binding| Ok((binding.variable, self.dictionary.text_of(binding.atom)?)))
            .collect()
    }

    /// Returns the number of stored triples.
    pub fn len(&self) -> EngineResult<u64> {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> EngineResult<bool> {
        self.buckets.is_empty()
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &MemAtomDictionary {
        &self.dictionary
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn buckets(&self) -> &TripleBuckets {
        &self.buckets
    }

    /// Returns the directory of the bucket files.
    pub fn directory(&self) -> PathBuf {
        self.config.directory.clone().unwrap_or_else(|| {
            self.owned_directory
                .as_ref()
                .map(|directory| directory.path().to_path_buf())
                .unwrap_or_default()
        })
    }

    /// Returns the directory into which operators spill.
    pub fn temp_directory(&self) -> PathBuf {
        self.temp.directory().to_path_buf()
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("directory", &self.directory())
            .field("atoms", &self.dictionary.len())
            .finish_non_exhaustive()
    }
}

fn load<S, P, O>(
    buckets: &TripleBuckets,
    dictionary: &dyn AtomDictionary,
    triples: impl IntoIterator<Item = (S, P, O)>,
) -> EngineResult<()>
where
    S: AsRef<str>,
    P: AsRef<str>,
    O: AsRef<str>,
{
    let mut batch = Vec::with_capacity(LOAD_BATCH);
    for (subject, predicate, object) in triples {
        batch.push(EncodedTriple::new(
            dictionary.intern(subject.as_ref()),
            dictionary.intern(predicate.as_ref()),
            dictionary.intern(object.as_ref()),
        ));
        if batch.len() == LOAD_BATCH {
            buckets.insert(&batch)?;
            batch.clear();
        }
    }
    if !batch.is_empty() {
        buckets.insert(&batch)?;
    }
    Ok(())
}

/// The lazy, forward-only results of a [QueryPlan].
///
/// The operator tree is disposed once the results are exhausted, after the first error, or when
/// the iterator is dropped.
#[derive(Debug)]
pub struct QuerySolutions {
    operator: Option<BoxedOperator>,
}

impl QuerySolutions {
    fn new(operator: BoxedOperator) -> Self {
        Self {
            operator: Some(operator),
        }
    }

    /// Returns the variables by which the remaining results are sorted.
    pub fn sort_order(&self) -> &[Variable] {
        match &self.operator {
            Some(operator) => operator.sort_order(),
            None => &[],
        }
    }

    fn close(&mut self) {
        if let Some(mut operator) = self.operator.take() {
            operator.dispose();
        }
    }
}

impl Iterator for QuerySolutions {
    type Item = EngineResult<BindingSet>;

    fn next(&mut self) -> Option<Self::Item> {
        let operator = self.operator.as_mut()?;
        if !operator.has_next() {
            self.close();
            return None;
        }
        let result = operator.next();
        if result.is_err() {
            self.close();
        }
        Some(result)
    }
}

impl Drop for QuerySolutions {
    fn drop(&mut self) {
        self.close();
    }
}
