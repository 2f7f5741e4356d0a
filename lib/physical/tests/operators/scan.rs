use crate::fixture::{atom, collect, sorted, var, Fixture, ATOMS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rdf_bucket_common::{CountingMetrics, EngineError, NoopMetrics};
use rdf_bucket_model::{Atom, BucketOrder, EncodedTriple, TripleItem, TriplePattern};
use rdf_bucket_physical::{PhysicalOperator, ScanOperator};
use std::sync::Arc;

fn random_item(rng: &mut StdRng) -> TripleItem {
    if rng.random_bool(0.5) {
        var(rng.random_range(1..=3))
    } else {
        atom(rng.random_range(1..=ATOMS))
    }
}

#[test]
fn scans_of_every_bucket_match_brute_force() {
    let fixture = Fixture::random(5, 300);
    let mut rng = StdRng::seed_from_u64(8);
    for _ in 0..100 {
        let pattern = TriplePattern::new(
            random_item(&mut rng),
            random_item(&mut rng),
            random_item(&mut rng),
        );
        let expected = fixture.evaluate(&[pattern]);
        for order in pattern.access_orders() {
            let scan = ScanOperator::try_new(
                &fixture.buckets,
                &fixture.index,
                pattern,
                order,
                Arc::new(NoopMetrics),
            )
            .unwrap();
            assert_eq!(sorted(collect(Box::new(scan))), expected, "{pattern} on {order}");
        }
    }
}

#[test]
fn range_scan_stops_after_the_leading_atoms() {
    let fixture = Fixture::new(vec![
        EncodedTriple::from_ids(1, 1, 1),
        EncodedTriple::from_ids(1, 2, 3),
        EncodedTriple::from_ids(1, 2, 4),
        EncodedTriple::from_ids(1, 3, 5),
        EncodedTriple::from_ids(1, 4, 6),
        EncodedTriple::from_ids(2, 2, 2),
    ]);
    let metrics = Arc::new(CountingMetrics::new());
    let scan = fixture.scan(TriplePattern::new(atom(1), atom(2), var(1)), metrics.clone());
    assert_eq!(collect(scan).len(), 2);

    // Skips (1 1 1), reads both matches and stops at (1 3 5).
    let counters = metrics.counters("scan");
    assert_eq!(counters.records_read, 4);
    assert_eq!(counters.results, 2);
}

#[test]
fn atom_absent_from_a_position_yields_nothing() {
    let fixture = Fixture::new(vec![
        EncodedTriple::from_ids(1, 2, 3),
        EncodedTriple::from_ids(3, 2, 4),
    ]);
    let scan = ScanOperator::try_new(
        &fixture.buckets,
        &fixture.index,
        TriplePattern::new(var(1), atom(1), var(2)),
        BucketOrder::POS,
        Arc::new(NoopMetrics),
    )
    .unwrap();
    assert!(!scan.has_next());
}

#[test]
fn unknown_atom_is_not_found() {
    let fixture = Fixture::new(vec![EncodedTriple::from_ids(1, 2, 3)]);
    let result = ScanOperator::try_new(
        &fixture.buckets,
        &fixture.index,
        TriplePattern::new(Atom(99), var(1), var(2)),
        BucketOrder::SPO,
        Arc::new(NoopMetrics),
    );
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[test]
fn next_after_exhaustion_fails() {
    let fixture = Fixture::new(vec![EncodedTriple::from_ids(1, 2, 3)]);
    let mut scan = fixture.scan(TriplePattern::new(atom(1), var(1), var(2)), Arc::new(NoopMetrics));
    assert!(scan.peek().is_some());
    scan.next().unwrap();
    assert!(matches!(scan.next(), Err(EngineError::InvalidOperation(_))));

    scan.dispose();
    scan.dispose();
    assert!(!scan.has_next());
}
