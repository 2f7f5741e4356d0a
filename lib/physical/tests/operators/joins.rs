use crate::fixture::{atom, collect, sorted, var, Fixture};
use rdf_bucket_common::{CountingMetrics, EngineError, NoopMetrics};
use rdf_bucket_model::{TriplePattern, Variable};
use rdf_bucket_physical::{HashJoinOperator, MergeJoinOperator, PhysicalOperator, SortOperator};
use std::sync::Arc;

/// ?v1 a1 ?v2 . ?v3 a2 ?v2, both scanned from the POS bucket and therefore sorted by ?v2.
fn patterns() -> [TriplePattern; 2] {
    [
        TriplePattern::new(var(1), atom(1), var(2)),
        TriplePattern::new(var(3), atom(2), var(2)),
    ]
}

#[test]
fn merge_join_matches_nested_loops() {
    let fixture = Fixture::random(1, 400);
    let [left, right] = patterns();
    for buffered in [1, 3, 1000] {
        let join = MergeJoinOperator::try_new(
            fixture.scan(left, Arc::new(NoopMetrics)),
            fixture.scan(right, Arc::new(NoopMetrics)),
            vec![Variable(2)],
            buffered,
            Arc::clone(&fixture.temp),
            Arc::new(NoopMetrics),
        )
        .unwrap();
        let results = collect(Box::new(join));
        assert!(!results.is_empty());
        assert_eq!(sorted(results), fixture.evaluate(&[left, right]), "buffer {buffered}");
    }
}

#[test]
fn merge_join_checks_shared_variables_outside_the_key() {
    let fixture = Fixture::random(2, 400);
    // Both inputs bind ?v1 and ?v2 but are only sorted by ?v2.
    let left = TriplePattern::new(var(1), atom(1), var(2));
    let right = TriplePattern::new(var(1), atom(2), var(2));
    let join = MergeJoinOperator::try_new(
        fixture.scan(left, Arc::new(NoopMetrics)),
        fixture.scan(right, Arc::new(NoopMetrics)),
        vec![Variable(2)],
        2,
        Arc::clone(&fixture.temp),
        Arc::new(NoopMetrics),
    )
    .unwrap();
    assert_eq!(sorted(collect(Box::new(join))), fixture.evaluate(&[left, right]));
}

#[test]
fn merge_join_rejects_unsorted_inputs() {
    let fixture = Fixture::random(3, 10);
    let [left, right] = patterns();
    let result = MergeJoinOperator::try_new(
        fixture.scan(left, Arc::new(NoopMetrics)),
        fixture.scan(right, Arc::new(NoopMetrics)),
        vec![Variable(1)],
        10,
        Arc::clone(&fixture.temp),
        Arc::new(NoopMetrics),
    );
    assert!(matches!(result, Err(EngineError::Configuration(_))));
}

#[test]
fn hash_join_agrees_with_merge_join() {
    let fixture = Fixture::random(4, 400);
    let [left, right] = patterns();
    let merge = MergeJoinOperator::try_new(
        fixture.scan(left, Arc::new(NoopMetrics)),
        fixture.scan(right, Arc::new(NoopMetrics)),
        vec![Variable(2)],
        16,
        Arc::clone(&fixture.temp),
        Arc::new(NoopMetrics),
    )
    .unwrap();
    let expected = sorted(collect(Box::new(merge)));

    for records_per_input in [1, 5, 10_000] {
        let metrics = Arc::new(CountingMetrics::new());
        let hash = HashJoinOperator::try_new(
            fixture.scan(left, Arc::new(NoopMetrics)),
            fixture.scan(right, Arc::new(NoopMetrics)),
            vec![Variable(2)],
            records_per_input,
            Arc::clone(&fixture.temp),
            metrics.clone(),
        )
        .unwrap();
        assert_eq!(sorted(collect(Box::new(hash))), expected);
        assert_eq!(metrics.counters("hash-join").results, expected.len() as u64);
        if records_per_input == 1 {
            assert!(metrics.counters("hash-join").records_spilled > 0);
        }
    }
}

#[test]
fn hash_join_without_variables_is_a_cross_product() {
    let fixture = Fixture::random(5, 50);
    let left = TriplePattern::new(var(1), atom(1), atom(1));
    let right = TriplePattern::new(var(2), atom(2), var(3));
    let join = HashJoinOperator::try_new(
        fixture.scan(left, Arc::new(NoopMetrics)),
        fixture.scan(right, Arc::new(NoopMetrics)),
        Vec::new(),
        3,
        Arc::clone(&fixture.temp),
        Arc::new(NoopMetrics),
    )
    .unwrap();
    let results = sorted(collect(Box::new(join)));
    assert_eq!(
        results.len(),
        fixture.evaluate(&[left]).len() * fixture.evaluate(&[right]).len()
    );
    assert_eq!(results, fixture.evaluate(&[left, right]));
}

#[test]
fn sort_enables_merge_join_on_other_variables() {
    let fixture = Fixture::random(6, 300);
    // Joined on ?v1, which neither scan is sorted by.
    let left = TriplePattern::new(var(1), atom(2), var(2));
    let right = TriplePattern::new(var(3), atom(3), var(1));
    let sort_left = SortOperator::try_new(
        fixture.scan(left, Arc::new(NoopMetrics)),
        vec![Variable(1), Variable(2)],
        4,
        &fixture.temp,
        Arc::new(NoopMetrics),
    )
    .unwrap();
    let sort_right = SortOperator::try_new(
        fixture.scan(right, Arc::new(NoopMetrics)),
        vec![Variable(1), Variable(3)],
        4,
        &fixture.temp,
        Arc::new(NoopMetrics),
    )
    .unwrap();
    let join = MergeJoinOperator::try_new(
        Box::new(sort_left),
        Box::new(sort_right),
        vec![Variable(1)],
        2,
        Arc::clone(&fixture.temp),
        Arc::new(NoopMetrics),
    )
    .unwrap();
    assert_eq!(sorted(collect(Box::new(join))), fixture.evaluate(&[left, right]));
}

#[test]
fn disposing_a_join_releases_its_files() {
    let fixture = Fixture::random(7, 200);
    let [left, right] = patterns();
    let mut join = HashJoinOperator::try_new(
        fixture.scan(left, Arc::new(NoopMetrics)),
        fixture.scan(right, Arc::new(NoopMetrics)),
        vec![Variable(2)],
        1,
        Arc::clone(&fixture.temp),
        Arc::new(NoopMetrics),
    )
    .unwrap();
    assert!(join.has_next());
    assert!(fixture.temp_files() > 0);

    join.dispose();
    join.dispose();
    assert!(!join.has_next());
    assert!(matches!(join.next(), Err(EngineError::InvalidOperation(_))));
    assert_eq!(fixture.temp_files(), 0);
}

#[test]
fn merged_results_bind_both_sides() {
    let fixture = Fixture::random(8, 100);
    let [left, right] = patterns();
    let join = HashJoinOperator::try_new(
        fixture.scan(left, Arc::new(NoopMetrics)),
        fixture.scan(right, Arc::new(NoopMetrics)),
        vec![Variable(2)],
        100,
        Arc::clone(&fixture.temp),
        Arc::new(NoopMetrics),
    )
    .unwrap();
    for result in collect(Box::new(join)) {
        assert_eq!(
            result.variables(),
            vec![Variable(1), Variable(2), Variable(3)],
            "{result}"
        );
    }
}
