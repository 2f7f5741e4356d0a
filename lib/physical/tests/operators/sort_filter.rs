use crate::fixture::{atom, collect, sorted, var, Fixture};
use rdf_bucket_common::{CountingMetrics, EngineError, NoopMetrics};
use rdf_bucket_logical::{FilterExpression, VariableFilter};
use rdf_bucket_model::{Atom, BindingSet, TriplePattern, Variable};
use rdf_bucket_physical::{FilterOperator, PhysicalOperator, SortOperator};
use regex::Regex;
use std::sync::Arc;

#[test]
fn sort_orders_and_projects() {
    let fixture = Fixture::random(21, 300);
    let pattern = TriplePattern::new(var(1), var(2), var(3));
    for memory in [1, 3, 1_000] {
        let metrics = Arc::new(CountingMetrics::new());
        let sort = SortOperator::try_new(
            fixture.scan(pattern, Arc::new(NoopMetrics)),
            vec![Variable(3), Variable(1)],
            memory,
            &fixture.temp,
            metrics.clone(),
        )
        .unwrap();
        assert_eq!(sort.sort_order(), &[Variable(3), Variable(1)]);

        let expected = fixture
            .evaluate(&[pattern])
            .into_iter()
            .map(|bindings| bindings.project(&[Variable(1), Variable(3)]))
            .collect::<Vec<_>>();
        assert_eq!(sorted(collect(Box::new(sort))), sorted(expected));
        assert_eq!(
            metrics.counters("sort").records_spilled,
            fixture.triples.len() as u64
        );
    }
    assert_eq!(fixture.temp_files(), 0);
}

#[test]
fn sort_of_empty_input() {
    let fixture = Fixture::random(22, 10);
    let sort = SortOperator::try_new(
        fixture.scan(TriplePattern::new(var(1), atom(8), atom(1)), Arc::new(NoopMetrics)),
        vec![Variable(1)],
        10,
        &fixture.temp,
        Arc::new(NoopMetrics),
    )
    .unwrap();
    assert!(!sort.has_next());
}

#[test]
fn sort_requires_variables() {
    let fixture = Fixture::random(23, 10);
    let result = SortOperator::try_new(
        fixture.scan(TriplePattern::new(var(1), var(2), var(3)), Arc::new(NoopMetrics)),
        Vec::new(),
        10,
        &fixture.temp,
        Arc::new(NoopMetrics),
    );
    assert!(matches!(result, Err(EngineError::Configuration(_))));
}

fn filtered(
    fixture: &Fixture,
    pattern: TriplePattern,
    filters: Vec<VariableFilter>,
) -> Vec<BindingSet> {
    let filter = FilterOperator::try_new(
        fixture.scan(pattern, Arc::new(NoopMetrics)),
        filters,
        fixture.dictionary.clone(),
        Arc::new(NoopMetrics),
    )
    .unwrap();
    sorted(collect(Box::new(filter)))
}

#[test]
fn filter_expressions() {
    let fixture = Fixture::random(24, 200);
    let pattern = TriplePattern::new(var(1), atom(1), var(2));
    let all = fixture.evaluate(&[pattern]);
    let keep = |predicate: &dyn Fn(Atom) -> bool| {
        all.iter()
            .filter(|bindings| predicate(bindings.get(Variable(2)).unwrap()))
            .cloned()
            .collect::<Vec<_>>()
    };

    let equals = filtered(
        &fixture,
        pattern,
        vec![VariableFilter::new(Variable(2), FilterExpression::Equals(Atom(3)))],
    );
    assert_eq!(equals, keep(&|atom| atom == Atom(3)));

    let not_equals = filtered(
        &fixture,
        pattern,
        vec![VariableFilter::new(Variable(2), FilterExpression::NotEquals(Atom(3)))],
    );
    assert_eq!(not_equals, keep(&|atom| atom != Atom(3)));

    let one_of = filtered(
        &fixture,
        pattern,
        vec![VariableFilter::new(
            Variable(2),
            FilterExpression::OneOf(vec![Atom(2), Atom(5)]),
        )],
    );
    assert_eq!(one_of, keep(&|atom| atom == Atom(2) || atom == Atom(5)));

    let matches = filtered(
        &fixture,
        pattern,
        vec![VariableFilter::new(
            Variable(2),
            FilterExpression::Matches(Regex::new("^t[1-4]$").unwrap()),
        )],
    );
    assert_eq!(matches, keep(&|atom| atom.0 <= 4));
}

#[test]
fn filters_on_unbound_variables_are_ignored() {
    let fixture = Fixture::random(25, 100);
    let pattern = TriplePattern::new(var(1), atom(2), var(2));
    let results = filtered(
        &fixture,
        pattern,
        vec![
            VariableFilter::new(Variable(9), FilterExpression::Equals(Atom(1))),
            VariableFilter::new(Variable(1), FilterExpression::NotEquals(Atom(1))),
        ],
    );
    let expected = fixture
        .evaluate(&[pattern])
        .into_iter()
        .filter(|bindings| bindings.get(Variable(1)) != Some(Atom(1)))
        .collect::<Vec<_>>();
    assert_eq!(results, expected);
}

#[test]
fn filter_requires_expressions() {
    let fixture = Fixture::random(26, 10);
    let result = FilterOperator::try_new(
        fixture.scan(TriplePattern::new(var(1), var(2), var(3)), Arc::new(NoopMetrics)),
        Vec::new(),
        fixture.dictionary.clone(),
        Arc::new(NoopMetrics),
    );
    assert!(matches!(result, Err(EngineError::Configuration(_))));
}
