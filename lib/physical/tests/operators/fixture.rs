use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rdf_bucket_common::{AtomDictionary, MemAtomDictionary, MemKeyValueStore, MetricsSink};
use rdf_bucket_model::{BindingSet, EncodedTriple, TripleItem, TriplePattern, Variable};
use rdf_bucket_physical::{BoxedOperator, ScanOperator};
use rdf_bucket_storage::{Index, TempSpace, TripleBuckets};
use std::sync::Arc;
use tempfile::TempDir;

/// The number of distinct atoms in a fixture. Atom `i` has the text `t{i}`.
pub const ATOMS: i64 = 8;

/// A small sorted and indexed store.
pub struct Fixture {
    _directory: TempDir,
    pub buckets: Arc<TripleBuckets>,
    pub index: Arc<Index>,
    pub dictionary: Arc<MemAtomDictionary>,
    pub temp: Arc<TempSpace>,
    pub triples: Vec<EncodedTriple>,
}

impl Fixture {
    pub fn new(triples: Vec<EncodedTriple>) -> Self {
        let directory = tempfile::tempdir().unwrap();
        let dictionary = Arc::new(MemAtomDictionary::new());
        for i in 1..=ATOMS {
            dictionary.intern(&format!("t{i}"));
        }

        let temp = Arc::new(TempSpace::new(Some(11)).unwrap());
        let buckets = TripleBuckets::create(directory.path()).unwrap();
        buckets.insert(&triples).unwrap();
        buckets.sort(7, &temp).unwrap();
        let index = Index::build(&buckets, Arc::new(MemKeyValueStore::new())).unwrap();

        Self {
            _directory: directory,
            buckets: Arc::new(buckets),
            index: Arc::new(index),
            dictionary,
            temp,
            triples,
        }
    }

    /// Random triples in which every atom occurs at least once in every position.
    pub fn random(seed: u64, len: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut triples = (1..=ATOMS)
            .map(|i| EncodedTriple::from_ids(i, i, i))
            .collect::<Vec<_>>();
        triples.extend((0..len).map(|_| {
            EncodedTriple::from_ids(
                rng.random_range(1..=ATOMS),
                rng.random_range(1..=ATOMS / 2),
                rng.random_range(1..=ATOMS),
            )
        }));
        Self::new(triples)
    }

    pub fn scan(&self, pattern: TriplePattern, metrics: Arc<dyn MetricsSink>) -> BoxedOperator {
        let order = pattern.access_orders()[0];
        Box::new(
            ScanOperator::try_new(&self.buckets, &self.index, pattern, order, metrics).unwrap(),
        )
    }

    /// The number of files in the temp space.
    pub fn temp_files(&self) -> usize {
        std::fs::read_dir(self.temp.directory()).unwrap().count()
    }

    /// Evaluates the conjunction of `patterns` by nested loops.
    pub fn evaluate(&self, patterns: &[TriplePattern]) -> Vec<BindingSet> {
        let mut results = vec![BindingSet::new()];
        for pattern in patterns {
            results = results
                .iter()
                .flat_map(|result| {
                    self.triples
                        .iter()
                        .filter_map(|triple| pattern.bind(triple))
                        .filter_map(|bindings| result.merge(&bindings))
                        .collect::<Vec<_>>()
                })
                .collect();
        }
        results.sort();
        results
    }
}

pub fn atom(id: i64) -> TripleItem {
    rdf_bucket_model::Atom(id).into()
}

pub fn var(id: i64) -> TripleItem {
    Variable(id).into()
}

/// Drains `operator` and checks that the results respect its sort order.
pub fn collect(mut operator: BoxedOperator) -> Vec<BindingSet> {
    let sort_order = operator.sort_order().to_vec();
    let mut results = Vec::new();
    while operator.has_next() {
        results.push(operator.next().unwrap());
    }
    let keys = results
        .iter()
        .map(|bindings| bindings.values_of(&sort_order).unwrap())
        .collect::<Vec<_>>();
    assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]), "not sorted by {sort_order:?}");
    operator.dispose();
    results
}

pub fn sorted(mut results: Vec<BindingSet>) -> Vec<BindingSet> {
    results.sort();
    results
}
