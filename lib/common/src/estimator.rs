use rdf_bucket_model::{TriplePattern, TriplePosition};

/// Provides cardinality estimates to the planning rules.
pub trait CardinalityEstimator {
    /// Estimates the number of triples matching `pattern`.
    fn estimate_pattern(&self, pattern: &TriplePattern) -> u64;

    /// Estimates the size of joining two inputs with `left` and `right` results.
    ///
    /// `positions` contains one `(left position, right position)` pair for every variable
    /// occurrence the join is justified by. An empty slice denotes a cross product.
    fn estimate_join(
        &self,
        left: u64,
        right: u64,
        positions: &[(TriplePosition, TriplePosition)],
    ) -> u64;
}
