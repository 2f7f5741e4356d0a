use crate::fixture::{atom, var, Fixture, ATOMS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rdf_bucket_common::{CountingMetrics, MetricsSink};
use rdf_bucket_logical::{FilterExpression, PlanGenerator, PlannerConfig, VariableFilter};
use rdf_bucket_model::{Atom, BindingSet, TripleItem, TriplePattern, Variable};
use rdf_bucket_physical::OperatorBuilder;
use std::sync::Arc;

fn random_item(rng: &mut StdRng) -> TripleItem {
    if rng.random_bool(0.6) {
        var(rng.random_range(1..=4))
    } else {
        atom(rng.random_range(1..=ATOMS))
    }
}

fn builder(fixture: &Fixture, metrics: Arc<dyn MetricsSink>) -> OperatorBuilder {
    OperatorBuilder::new(
        Arc::clone(&fixture.buckets),
        Arc::clone(&fixture.index),
        fixture.dictionary.clone(),
        Arc::clone(&fixture.temp),
    )
    .with_metrics(metrics)
}

fn run(
    builder: &OperatorBuilder,
    generator: &mut PlanGenerator,
    patterns: &[TriplePattern],
) -> Vec<BindingSet> {
    let plan = generator.generate(patterns).unwrap();
    let mut operator = builder.build(&plan).unwrap();
    let mut results = Vec::new();
    while operator.has_next() {
        results.push(operator.next().unwrap());
    }
    operator.dispose();
    results.sort();
    results
}

#[test]
fn generated_plans_match_brute_force() {
    let fixture = Fixture::random(31, 150);
    let metrics = Arc::new(CountingMetrics::new());
    let builder = builder(&fixture, metrics.clone());
    let mut rng = StdRng::seed_from_u64(32);

    for round in 0..60 {
        let len = rng.random_range(1..=3);
        let patterns = (0..len)
            .map(|_| {
                TriplePattern::new(
                    random_item(&mut rng),
                    random_item(&mut rng),
                    random_item(&mut rng),
                )
            })
            .collect::<Vec<_>>();
        let config = PlannerConfig::default()
            .with_memory_budget(if round % 2 == 0 { 0 } else { 1 << 20 })
            .with_sort_merge_joins(round % 3 == 0)
            .with_random_seed(Some(round));
        let mut generator = PlanGenerator::new(config);

        assert_eq!(
            run(&builder, &mut generator, &patterns),
            fixture.evaluate(&patterns),
            "{patterns:?}"
        );
    }
    assert!(metrics.counters("scan").records_read > 0);
    assert_eq!(fixture.temp_files(), 0);
}

#[test]
fn filters_are_applied_on_top() {
    let fixture = Fixture::random(33, 150);
    let builder = builder(&fixture, Arc::new(CountingMetrics::new()));
    let patterns = [
        TriplePattern::new(var(1), atom(1), var(2)),
        TriplePattern::new(var(2), atom(2), var(3)),
    ];
    let plan = PlanGenerator::new(PlannerConfig::default().with_random_seed(Some(1)))
        .generate(&patterns)
        .unwrap()
        .with_filters(vec![VariableFilter::new(
            Variable(3),
            FilterExpression::OneOf(vec![Atom(1), Atom(2)]),
        )])
        .unwrap();

    let mut operator = builder.build(&plan).unwrap();
    let mut results = Vec::new();
    while operator.has_next() {
        results.push(operator.next().unwrap());
    }
    results.sort();

    let expected = fixture
        .evaluate(&patterns)
        .into_iter()
        .filter(|bindings| matches!(bindings.get(Variable(3)), Some(Atom(1) | Atom(2))))
        .collect::<Vec<_>>();
    assert_eq!(results, expected);
}
