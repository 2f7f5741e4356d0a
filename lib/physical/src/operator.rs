use rdf_bucket_common::{EngineError, EngineResult};
use rdf_bucket_model::{Atom, BindingSet, Variable};
use std::fmt::Debug;

/// A pull-based stream of binding sets.
///
/// Operators compute their first result on construction. [PhysicalOperator::peek] shows the
/// result [PhysicalOperator::next] returns next, which fails with
/// [EngineError::InvalidOperation] once the operator is exhausted.
pub trait PhysicalOperator: Debug + Send {
    /// The name under which the operator reports metrics.
    fn name(&self) -> &'static str;

    fn has_next(&self) -> bool {
        self.peek().is_some()
    }

    fn peek(&self) -> Option<&BindingSet>;

    fn next(&mut self) -> EngineResult<BindingSet>;

    /// The variables by which the results are sorted.
    fn sort_order(&self) -> &[Variable];

    /// Releases the temporary files of this operator and its inputs. Calling this more than once
    /// has no effect. An operator has no further results after being disposed.
    fn dispose(&mut self);
}

pub type BoxedOperator = Box<dyn PhysicalOperator>;

pub(crate) fn exhausted() -> EngineError {
    EngineError::InvalidOperation("The operator has no further results.")
}

/// Returns the values of `variables` in `bindings`.
pub(crate) fn key_of(bindings: &BindingSet, variables: &[Variable]) -> EngineResult<Vec<Atom>> {
    bindings.values_of(variables).ok_or_else(|| {
        EngineError::configuration(format!(
            "The binding set {bindings} does not bind all of the key variables."
        ))
    })
}

/// Drains `operator`.
pub(crate) fn drain(
    operator: &mut dyn PhysicalOperator,
    mut f: impl FnMut(BindingSet) -> EngineResult<()>,
) -> EngineResult<()> {
    while operator.has_next() {
        f(operator.next()?)?;
    }
    Ok(())
}
