use crate::collapse::SapId;
use crate::rules::{
    keep_min_by_key, Candidate, CardinalityRule, LiteralCountRule, Rule, RuleChain, TieBreak,
};
use rdf_bucket_model::TriplePattern;

/// A pattern that could seed the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedCandidate {
    /// The index of the atom-collapse node the candidate stems from.
    pub node: usize,
    pub sap: SapId,
    pub pattern: TriplePattern,
    pub estimate: Option<u64>,
}

impl Candidate for SeedCandidate {
    fn atom_count(&self) -> usize {
        self.pattern.atom_count()
    }

    fn estimate(&self) -> Option<u64> {
        self.estimate
    }
}

/// Keeps the patterns with the most selective combination of bound positions.
///
/// This uses the heuristics from Oxigraph's join reordering.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternSelectivityRule;

impl PatternSelectivityRule {
    /// Ranks a pattern by its bound positions. Smaller is more selective.
    pub fn rank(pattern: &TriplePattern) -> u64 {
        let subject_bound = pattern.subject.is_atom();
        let predicate_bound = pattern.predicate.is_atom();
        let object_bound = pattern.object.is_atom();

        match (subject_bound, predicate_bound, object_bound) {
            (true, true, true) => 1,
            (true, true, false) => 10,
            (true, false, true) => 2,
            (false, true, true) => 10_000,
            (true, false, false) => 100,
            (false, false, false) => 1_000_000_000,
            (false, true, false) => 1_000_000,
            (false, false, true) => 100_000,
        }
    }
}

impl Rule<SeedCandidate> for PatternSelectivityRule {
    fn name(&self) -> &'static str {
        "pattern-selectivity"
    }

    fn filter(&self, candidates: Vec<SeedCandidate>) -> Vec<SeedCandidate> {
        keep_min_by_key(candidates, |c| Self::rank(&c.pattern))
    }
}

/// Pattern selectivity, cardinality, literal count and the tie break.
pub fn seed_chain(tie_break: TieBreak, seed: Option<u64>) -> RuleChain<SeedCandidate> {
    RuleChain::new(vec![
        Box::new(PatternSelectivityRule),
        Box::new(CardinalityRule),
        Box::new(LiteralCountRule),
        tie_break.rule(seed),
    ])
}
