use rdf_bucket_common::CardinalityEstimator;
use rdf_bucket_logical::{PlanGenerator, PlanOperator, PlannerConfig, TieBreak};
use rdf_bucket_model::{Atom, TripleItem, TriplePattern, TriplePosition, Variable};
use std::collections::BTreeMap;
use std::sync::Arc;

pub fn atom(id: i64) -> TripleItem {
    Atom(id).into()
}

pub fn var(id: i64) -> TripleItem {
    Variable(id).into()
}

/// A deterministic generator that does not hand out memory.
pub fn generator(config: PlannerConfig) -> PlanGenerator {
    PlanGenerator::new(config.with_tie_break(TieBreak::First))
}

/// Estimates patterns by the atom in their predicate position. Joins multiply their inputs.
#[derive(Debug, Default)]
pub struct PredicateEstimator {
    pub predicates: BTreeMap<Atom, u64>,
}

impl PredicateEstimator {
    pub fn new(predicates: impl IntoIterator<Item = (i64, u64)>) -> Arc<Self> {
        Arc::new(Self {
            predicates: predicates
                .into_iter()
                .map(|(atom, count)| (Atom(atom), count))
                .collect(),
        })
    }
}

impl CardinalityEstimator for PredicateEstimator {
    fn estimate_pattern(&self, pattern: &TriplePattern) -> u64 {
        pattern
            .get(TriplePosition::Predicate)
            .as_atom()
            .and_then(|atom| self.predicates.get(&atom).copied())
            .unwrap_or(1000)
    }

    fn estimate_join(
        &self,
        left: u64,
        right: u64,
        _positions: &[(TriplePosition, TriplePosition)],
    ) -> u64 {
        left.saturating_mul(right)
    }
}

/// Visits all operators of a plan.
pub fn operators(root: &PlanOperator) -> Vec<&PlanOperator> {
    let mut result = vec![root];
    let mut i = 0;
    while i < result.len() {
        let children = result[i].children();
        result.extend(children);
        i += 1;
    }
    result
}
