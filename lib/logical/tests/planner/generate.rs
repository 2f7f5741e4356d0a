use crate::test_utils::{atom, generator, var, PredicateEstimator};
use rdf_bucket_common::EngineError;
use rdf_bucket_logical::{FilterExpression, PlannerConfig, VariableFilter};
use rdf_bucket_model::{Atom, TriplePattern, Variable};

/// ?person a Person . ?person name ?name . ?book author ?person
fn author_query() -> Vec<TriplePattern> {
    vec![
        TriplePattern::new(var(1), atom(10), atom(11)),
        TriplePattern::new(var(1), atom(12), var(2)),
        TriplePattern::new(var(3), atom(13), var(1)),
    ]
}

#[test]
fn single_pattern_is_a_scan() {
    let plan = generator(PlannerConfig::default())
        .generate(&[TriplePattern::new(var(1), atom(2), var(3))])
        .unwrap();
    assert_eq!(plan.to_string(), "Scan[POS] (?v1 a2 ?v3)\n");
    assert_eq!(plan.root().memory_budget, 0);
}

#[test]
fn merge_join_is_preferred() {
    let plan = generator(PlannerConfig::default().with_memory_budget(1001))
        .generate(&author_query())
        .unwrap();
    insta::assert_snapshot!(plan, @r"
    HashJoin on [?v1] mem=400
      MergeJoin on [?v1] mem=600
        Scan[POS] (?v1 a10 a11)
        Scan[POS] (?v3 a13 ?v1)
      Scan[POS] (?v1 a12 ?v2)
    ");
}

#[test]
fn sort_merge_joins_replace_hash_joins() {
    let config = PlannerConfig::default()
        .with_memory_budget(0)
        .with_sort_merge_joins(true);
    let plan = generator(config).generate(&author_query()).unwrap();
    insta::assert_snapshot!(plan, @r"
    MergeJoin on [?v1]
      Sort [?v1, ?v3]
        MergeJoin on [?v1]
          Scan[POS] (?v1 a10 a11)
          Scan[POS] (?v3 a13 ?v1)
      Sort [?v1, ?v2]
        Scan[POS] (?v1 a12 ?v2)
    ");
}

#[test]
fn disconnected_patterns_become_a_cross_product() {
    let plan = generator(PlannerConfig::default().with_memory_budget(0))
        .generate(&[
            TriplePattern::new(atom(1), atom(2), var(1)),
            TriplePattern::new(atom(3), atom(4), var(2)),
        ])
        .unwrap();
    insta::assert_snapshot!(plan, @r"
    HashJoin on []
      Scan[SPO] (a1 a2 ?v1)
      Scan[SPO] (a3 a4 ?v2)
    ");
}

/// A triangle whose joins cannot be merged.
fn triangle() -> Vec<TriplePattern> {
    vec![
        TriplePattern::new(var(1), atom(1), var(2)),
        TriplePattern::new(var(2), atom(2), var(3)),
        TriplePattern::new(var(3), atom(3), var(1)),
    ]
}

#[test]
fn estimates_pick_the_smallest_join() {
    let plan = generator(PlannerConfig::default().with_memory_budget(0))
        .with_estimator(PredicateEstimator::new([(1, 10), (2, 1000), (3, 20)]))
        .generate(&triangle())
        .unwrap();
    insta::assert_snapshot!(plan, @r"
    HashJoin on [?v2, ?v3]
      HashJoin on [?v1]
        Scan[POS] (?v1 a1 ?v2)
        Scan[POS] (?v3 a3 ?v1)
      Scan[POS] (?v2 a2 ?v3)
    ");
}

#[test]
fn without_estimates_the_first_join_wins() {
    let plan = generator(PlannerConfig::default().with_memory_budget(0))
        .generate(&triangle())
        .unwrap();
    insta::assert_snapshot!(plan, @r"
    HashJoin on [?v1, ?v3]
      HashJoin on [?v2]
        Scan[POS] (?v1 a1 ?v2)
        Scan[POS] (?v2 a2 ?v3)
      Scan[POS] (?v3 a3 ?v1)
    ");
}

#[test]
fn filters_wrap_the_root() {
    let plan = generator(PlannerConfig::default().with_memory_budget(0))
        .generate(&author_query())
        .unwrap()
        .with_filters(vec![VariableFilter::new(
            Variable(2),
            FilterExpression::Equals(Atom(5)),
        )])
        .unwrap();
    assert!(plan.to_string().starts_with("Filter [?v2 = a5]\n  HashJoin on [?v1]"));
    assert_eq!(plan.variables(), vec![Variable(1), Variable(2), Variable(3)]);
}

#[test]
fn empty_query_is_rejected() {
    let result = generator(PlannerConfig::default()).generate(&[]);
    assert!(matches!(result, Err(EngineError::Configuration(_))));
}
