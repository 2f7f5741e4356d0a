use crate::operator::{exhausted, BoxedOperator, PhysicalOperator};
use rdf_bucket_common::{AtomDictionary, EngineError, EngineResult, MetricEvent, MetricsSink};
use rdf_bucket_logical::{FilterExpression, VariableFilter};
use rdf_bucket_model::{Atom, BindingSet, Variable};
use std::sync::Arc;

/// Drops the binding sets that violate one of its filters.
///
/// A filter on a variable that a binding set does not bind is ignored for this binding set.
#[derive(Debug)]
pub struct FilterOperator {
    input: BoxedOperator,
    filters: Vec<VariableFilter>,
    dictionary: Arc<dyn AtomDictionary>,
    current: Option<BindingSet>,
    metrics: Arc<dyn MetricsSink>,
}

impl FilterOperator {
    pub fn try_new(
        input: BoxedOperator,
        filters: Vec<VariableFilter>,
        dictionary: Arc<dyn AtomDictionary>,
        metrics: Arc<dyn MetricsSink>,
    ) -> EngineResult<Self> {
        if filters.is_empty() {
            return Err(EngineError::configuration(
                "A filter needs at least one expression.",
            ));
        }

        let mut filter = Self {
            input,
            filters,
            dictionary,
            current: None,
            metrics,
        };
        filter.current = filter.advance()?;
        Ok(filter)
    }

    fn advance(&mut self) -> EngineResult<Option<BindingSet>> {
        while self.input.has_next() {
            let bindings = self.input.next()?;
            if self.accepts(&bindings)? {
                return Ok(Some(bindings));
            }
        }
        Ok(None)
    }

    fn accepts(&self, bindings: &BindingSet) -> EngineResult<bool> {
        for filter in &self.filters {
            let Some(atom) = bindings.get(filter.variable) else {
                continue;
            };
            if !self.evaluate(&filter.expression, atom)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn evaluate(&self, expression: &FilterExpression, atom: Atom) -> EngineResult<bool> {
        Ok(match expression {
            FilterExpression::Equals(expected) => atom == *expected,
            FilterExpression::NotEquals(unexpected) => atom != *unexpected,
            FilterExpression::OneOf(atoms) => atoms.contains(&atom),
            FilterExpression::Matches(regex) => regex.is_match(&self.dictionary.text_of(atom)?),
        })
    }
}

impl PhysicalOperator for FilterOperator {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn peek(&self) -> Option<&BindingSet> {
        self.current.as_ref()
    }

    fn next(&mut self) -> EngineResult<BindingSet> {
        let result = self.current.take().ok_or_else(exhausted)?;
        self.current = self.advance()?;
        self.metrics.record(self.name(), MetricEvent::ResultProduced);
        Ok(result)
    }

    fn sort_order(&self) -> &[Variable] {
        self.input.sort_order()
    }

    fn dispose(&mut self) {
        self.current = None;
        self.input.dispose();
    }
}
