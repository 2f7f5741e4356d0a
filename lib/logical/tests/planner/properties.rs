use crate::test_utils::{atom, operators, var, PredicateEstimator};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rdf_bucket_logical::{PlanGenerator, PlanNode, PlannerConfig, TieBreak};
use rdf_bucket_model::{TripleItem, TriplePattern};

fn random_item(rng: &mut StdRng) -> TripleItem {
    if rng.random_bool(0.6) {
        var(rng.random_range(0..5))
    } else {
        atom(rng.random_range(0..20))
    }
}

fn random_query(rng: &mut StdRng) -> Vec<TriplePattern> {
    let len = rng.random_range(1..7);
    (0..len)
        .map(|_| TriplePattern::new(random_item(rng), random_item(rng), random_item(rng)))
        .collect()
}

#[test]
fn plans_cover_every_pattern_within_budget() {
    let mut rng = StdRng::seed_from_u64(17);
    for round in 0..200 {
        let query = random_query(&mut rng);
        let budget = rng.random_range(0..1_000_000);
        let config = PlannerConfig::default()
            .with_memory_budget(budget)
            .with_tie_break(TieBreak::Random)
            .with_random_seed(Some(round))
            .with_sort_merge_joins(round % 2 == 0);
        let mut generator = PlanGenerator::new(config);
        if round % 3 == 0 {
            generator = generator.with_estimator(PredicateEstimator::new([(1, 5), (2, 50)]));
        }

        let plan = generator.generate(&query).unwrap();
        let mut covered = plan.root().patterns();
        let mut expected = query.clone();
        covered.sort();
        expected.sort();
        assert_eq!(covered, expected, "{plan}");

        let total = operators(plan.root())
            .into_iter()
            .map(|operator| u64::from(operator.memory_budget))
            .sum::<u64>();
        assert!(total <= budget, "{total} > {budget} for {plan}");
    }
}

#[test]
fn merge_join_inputs_are_sorted_by_the_key() {
    let mut rng = StdRng::seed_from_u64(3);
    for round in 0..200 {
        let query = random_query(&mut rng);
        let config = PlannerConfig::default()
            .with_random_seed(Some(round))
            .with_sort_merge_joins(true);
        let plan = PlanGenerator::new(config).generate(&query).unwrap();

        for operator in operators(plan.root()) {
            if let PlanNode::MergeJoin {
                left,
                right,
                join_variables,
            } = &operator.node
            {
                assert!(!join_variables.is_empty(), "{plan}");
                assert!(left.sort_order().starts_with(join_variables), "{plan}");
                assert!(right.sort_order().starts_with(join_variables), "{plan}");
            }
        }
    }
}

#[test]
fn seeded_random_plans_are_reproducible() {
    let mut rng = StdRng::seed_from_u64(99);
    for round in 0..50 {
        let query = random_query(&mut rng);
        let config = PlannerConfig::default().with_random_seed(Some(round));
        let first = PlanGenerator::new(config.clone()).generate(&query).unwrap();
        let second = PlanGenerator::new(config).generate(&query).unwrap();
        assert_eq!(first, second);
    }
}
