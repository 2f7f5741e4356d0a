use crate::plan::{PlanNode, PlanOperator};

/// Distributes `budget` bytes over the operators of the plan rooted at `root`.
///
/// Each operator gets a share proportional to `1 / distance`, where the distance is the average
/// distance to the scans below it: scans have distance 0, sorts `1 + child` and joins
/// `1 + avg(children)`. Filters are transparent. Scans and filters receive no memory and every
/// share is capped at `u32::MAX`.
pub fn assign_memory(root: &mut PlanOperator, budget: u64) {
    let mut weights = Vec::new();
    collect_weights(root, &mut weights);
    let total: f64 = weights.iter().sum();

    let mut budgets = weights.into_iter().map(|weight| {
        if total <= 0.0 {
            return 0;
        }
        let share = (budget as f64 * weight / total).floor();
        if share >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            share as u32
        }
    });
    apply_budgets(root, &mut budgets);
}

/// Pushes the weights of all operators in post order and returns the distance of `operator`.
fn collect_weights(operator: &PlanOperator, weights: &mut Vec<f64>) -> f64 {
    let distance = match &operator.node {
        PlanNode::Scan { .. } => return 0.0,
        PlanNode::Filter { input, .. } => return collect_weights(input, weights),
        PlanNode::Sort { input, .. } => 1.0 + collect_weights(input, weights),
        PlanNode::MergeJoin { left, right, .. } | PlanNode::HashJoin { left, right, .. } => {
            let left = collect_weights(left, weights);
            let right = collect_weights(right, weights);
            1.0 + (left + right) / 2.0
        }
    };
    weights.push(1.0 / distance);
    distance
}

fn apply_budgets(operator: &mut PlanOperator, budgets: &mut impl Iterator<Item = u32>) {
    match &mut operator.node {
        PlanNode::Scan { .. } => return,
        PlanNode::Filter { input, .. } => return apply_budgets(input, budgets),
        PlanNode::Sort { input, .. } => apply_budgets(input, budgets),
        PlanNode::MergeJoin { left, right, .. } | PlanNode::HashJoin { left, right, .. } => {
            apply_budgets(left, budgets);
            apply_budgets(right, budgets);
        }
    }
    operator.memory_budget = budgets.next().unwrap_or(0);
}
