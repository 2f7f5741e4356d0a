//! Rule chains pick the next seed and the next join of the plan generator.
//!
//! Every rule narrows the candidates with one heuristic. The rules of a chain run in a fixed
//! order, each seeing the output of its predecessor, and the last rule of the chain picks the
//! final candidate.

mod join;
mod seed;

pub use join::{join_chain, JoinCandidate, JoinPositionRule, MergeJoinRule};
pub use seed::{seed_chain, PatternSelectivityRule, SeedCandidate};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Debug;

/// The data the generic rules need from a candidate.
pub trait Candidate: Clone + Debug {
    /// The number of atoms in the patterns covered by the candidate.
    fn atom_count(&self) -> usize;

    /// The estimated result size, if statistics are available.
    fn estimate(&self) -> Option<u64>;
}

/// One heuristic of a [RuleChain].
pub trait Rule<C>: Debug + Send {
    fn name(&self) -> &'static str;

    /// Narrows `candidates`. Rules that cannot discriminate return their input.
    fn filter(&self, candidates: Vec<C>) -> Vec<C> {
        candidates
    }

    /// Picks the index of one of the non-empty `candidates`.
    fn choose(&mut self, _candidates: &[C]) -> usize {
        0
    }
}

/// An ordered list of rules.
#[derive(Debug)]
pub struct RuleChain<C> {
    rules: Vec<Box<dyn Rule<C>>>,
}

impl<C: Clone + Debug> RuleChain<C> {
    pub fn new(rules: Vec<Box<dyn Rule<C>>>) -> Self {
        Self { rules }
    }

    /// Returns the names of the rules in their order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Selects one of `candidates`. Returns `None` if there are no candidates.
    ///
    /// A rule whose filter would remove every candidate leaves the candidates unchanged.
    pub fn select(&mut self, candidates: Vec<C>) -> Option<C> {
        if candidates.is_empty() {
            return None;
        }

        let mut candidates = candidates;
        let Some((last, filters)) = self.rules.split_last_mut() else {
            return candidates.into_iter().next();
        };
        for rule in &*filters {
            if candidates.len() == 1 {
                break;
            }
            let filtered = rule.filter(candidates.clone());
            if !filtered.is_empty() {
                tracing::trace!(
                    "Rule {} narrowed {} candidates to {}",
                    rule.name(),
                    candidates.len(),
                    filtered.len()
                );
                candidates = filtered;
            }
        }

        let index = last.choose(&candidates).min(candidates.len() - 1);
        candidates.into_iter().nth(index)
    }
}

/// Keeps the candidates with the minimal key.
pub(crate) fn keep_min_by_key<C, K: Ord>(candidates: Vec<C>, key: impl Fn(&C) -> K) -> Vec<C> {
    let Some(min) = candidates.iter().map(&key).min() else {
        return candidates;
    };
    candidates.into_iter().filter(|c| key(c) == min).collect()
}

/// Keeps the candidates with the smallest estimate. Passes through if there are no statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct CardinalityRule;

impl<C: Candidate> Rule<C> for CardinalityRule {
    fn name(&self) -> &'static str {
        "cardinality"
    }

    fn filter(&self, candidates: Vec<C>) -> Vec<C> {
        if candidates.iter().any(|c| c.estimate().is_none()) {
            return candidates;
        }
        keep_min_by_key(candidates, |c| c.estimate())
    }
}

/// Keeps the candidates with the most atoms.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralCountRule;

impl<C: Candidate> Rule<C> for LiteralCountRule {
    fn name(&self) -> &'static str {
        "literal-count"
    }

    fn filter(&self, candidates: Vec<C>) -> Vec<C> {
        keep_min_by_key(candidates, |c| std::cmp::Reverse(c.atom_count()))
    }
}

/// Picks a uniformly random candidate.
#[derive(Debug)]
pub struct RandomRule {
    rng: StdRng,
}

impl RandomRule {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }
}

impl<C> Rule<C> for RandomRule {
    fn name(&self) -> &'static str {
        "random"
    }

    fn choose(&mut self, candidates: &[C]) -> usize {
        self.rng.random_range(0..candidates.len().max(1))
    }
}

/// Picks the first candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstRule;

impl<C> Rule<C> for FirstRule {
    fn name(&self) -> &'static str {
        "first"
    }
}

/// The terminal rule of both rule chains.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// [RandomRule]
    #[default]
    Random,
    /// [FirstRule]
    First,
}

impl TieBreak {
    pub(crate) fn rule<C>(self, seed: Option<u64>) -> Box<dyn Rule<C>> {
        match self {
            TieBreak::Random => Box::new(RandomRule::new(seed)),
            TieBreak::First => Box::new(FirstRule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Fake {
        id: usize,
        atoms: usize,
        estimate: Option<u64>,
    }

    impl Candidate for Fake {
        fn atom_count(&self) -> usize {
            self.atoms
        }

        fn estimate(&self) -> Option<u64> {
            self.estimate
        }
    }

    fn fake(id: usize, atoms: usize, estimate: Option<u64>) -> Fake {
        Fake {
            id,
            atoms,
            estimate,
        }
    }

    #[test]
    fn rules_narrow_in_order() {
        let mut chain = RuleChain::<Fake>::new(vec![
            Box::new(CardinalityRule),
            Box::new(LiteralCountRule),
            Box::new(FirstRule),
        ]);
        let selected = chain
            .select(vec![
                fake(0, 3, Some(10)),
                fake(1, 1, Some(2)),
                fake(2, 2, Some(2)),
            ])
            .unwrap();
        assert_eq!(selected.id, 2);
    }

    #[test]
    fn missing_statistics_pass_through() {
        let mut chain = RuleChain::<Fake>::new(vec![
            Box::new(CardinalityRule),
            Box::new(LiteralCountRule),
            Box::new(FirstRule),
        ]);
        let selected = chain
            .select(vec![fake(0, 1, None), fake(1, 2, None)])
            .unwrap();
        assert_eq!(selected.id, 1);
        assert!(chain.select(Vec::new()).is_none());
    }

    #[test]
    fn seeded_random_rule_is_deterministic() {
        let candidates = (0..10).map(|i| fake(i, 0, None)).collect::<Vec<_>>();
        let pick = |seed| {
            let mut chain = RuleChain::<Fake>::new(vec![Box::new(RandomRule::new(Some(seed)))]);
            (0..5)
                .map(|_| chain.select(candidates.clone()).unwrap().id)
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(4), pick(4));
        assert!(pick(4).iter().all(|id| *id < 10));
    }
}
