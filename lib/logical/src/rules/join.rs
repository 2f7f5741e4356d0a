use crate::collapse::EdgeLabel;
use crate::rules::{
    keep_min_by_key, Candidate, CardinalityRule, LiteralCountRule, Rule, RuleChain, TieBreak,
};
use rdf_bucket_model::TriplePosition;

/// An edge of the join graph that could be joined next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCandidate {
    /// The index of the edge in the join graph.
    pub edge: usize,
    pub labels: Vec<EdgeLabel>,
    /// The number of atoms in the patterns of both endpoints.
    pub atoms: usize,
    /// Whether the endpoints can be merge-joined without sorting.
    pub merge_feasible: bool,
    pub estimate: Option<u64>,
}

impl Candidate for JoinCandidate {
    fn atom_count(&self) -> usize {
        self.atoms
    }

    fn estimate(&self) -> Option<u64> {
        self.estimate
    }
}

/// Keeps the joins that can be merge-joined without sorting.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeJoinRule;

impl Rule<JoinCandidate> for MergeJoinRule {
    fn name(&self) -> &'static str {
        "merge-join"
    }

    fn filter(&self, candidates: Vec<JoinCandidate>) -> Vec<JoinCandidate> {
        candidates.into_iter().filter(|c| c.merge_feasible).collect()
    }
}

/// Keeps the joins whose best label joins the most selective positions.
#[derive(Debug, Default, Clone, Copy)]
pub struct JoinPositionRule;

impl JoinPositionRule {
    /// Ranks the position pair of a label. Smaller is better.
    pub fn rank(label: &EdgeLabel) -> u32 {
        use TriplePosition::{Object, Predicate, Subject};
        match (label.left_position, label.right_position) {
            (Subject, Subject) => 1,
            (Subject, Object) | (Object, Subject) => 2,
            (Object, Object) => 3,
            (Subject, Predicate) | (Predicate, Subject) => 4,
            (Predicate, Object) | (Object, Predicate) => 5,
            (Predicate, Predicate) => 6,
        }
    }

    fn best_rank(candidate: &JoinCandidate) -> u32 {
        candidate
            .labels
            .iter()
            .map(Self::rank)
            .min()
            .unwrap_or(u32::MAX)
    }
}

impl Rule<JoinCandidate> for JoinPositionRule {
    fn name(&self) -> &'static str {
        "join-position"
    }

    fn filter(&self, candidates: Vec<JoinCandidate>) -> Vec<JoinCandidate> {
        keep_min_by_key(candidates, Self::best_rank)
    }
}

/// Merge-join feasibility, cardinality, literal count, join position and the tie break.
pub fn join_chain(tie_break: TieBreak, seed: Option<u64>) -> RuleChain<JoinCandidate> {
    RuleChain::new(vec![
        Box::new(MergeJoinRule),
        Box::new(CardinalityRule),
        Box::new(LiteralCountRule),
        Box::new(JoinPositionRule),
        tie_break.rule(seed),
    ])
}
