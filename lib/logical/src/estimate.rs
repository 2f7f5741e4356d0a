use crate::plan::{PlanNode, PlanOperator};
use rdf_bucket_common::CardinalityEstimator;
use rdf_bucket_model::{TriplePosition, Variable};

/// Estimates the number of results of `operator`.
pub fn estimate_plan(operator: &PlanOperator, estimator: &dyn CardinalityEstimator) -> u64 {
    match &operator.node {
        PlanNode::Scan { pattern, .. } => estimator.estimate_pattern(pattern),
        PlanNode::Sort { input, .. } | PlanNode::Filter { input, .. } => {
            estimate_plan(input, estimator)
        }
        PlanNode::MergeJoin { left, right, .. } | PlanNode::HashJoin { left, right, .. } => {
            let right_variables = right.variables();
            let positions = left
                .variables()
                .into_iter()
                .filter(|variable| right_variables.contains(variable))
                .filter_map(|variable| {
                    Some((position_of(left, variable)?, position_of(right, variable)?))
                })
                .collect::<Vec<_>>();
            estimator.estimate_join(
                estimate_plan(left, estimator),
                estimate_plan(right, estimator),
                &positions,
            )
        }
    }
}

/// The first position of `variable` in the scans below `operator`.
fn position_of(operator: &PlanOperator, variable: Variable) -> Option<TriplePosition> {
    operator
        .patterns()
        .iter()
        .find_map(|pattern| pattern.positions_of(variable).first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_bucket_model::{Atom, BucketOrder, TriplePattern};

    /// Returns 10 per pattern and records the positions of joins.
    struct FixedEstimator;

    impl CardinalityEstimator for FixedEstimator {
        fn estimate_pattern(&self, _pattern: &TriplePattern) -> u64 {
            10
        }

        fn estimate_join(
            &self,
            left: u64,
            right: u64,
            positions: &[(TriplePosition, TriplePosition)],
        ) -> u64 {
            if positions.is_empty() {
                left * right
            } else {
                left + right + positions.len() as u64
            }
        }
    }

    #[test]
    fn join_estimates_use_shared_variable_positions() {
        let left = PlanOperator::scan(
            TriplePattern::new(Atom(1), Variable(1), Variable(2)),
            BucketOrder::SPO,
        );
        let right = PlanOperator::scan(
            TriplePattern::new(Variable(2), Atom(3), Variable(3)),
            BucketOrder::POS,
        );
        let join = PlanOperator::hash_join(left.clone(), right, vec![Variable(2)]);
        assert_eq!(estimate_plan(&join, &FixedEstimator), 21);

        let unrelated = PlanOperator::scan(
            TriplePattern::new(Variable(7), Atom(3), Variable(8)),
            BucketOrder::POS,
        );
        let cross = PlanOperator::hash_join(left, unrelated, vec![]);
        assert_eq!(estimate_plan(&cross, &FixedEstimator), 100);
    }
}
