//! Turns a basic graph pattern into a descriptive query plan.
//!
//! Planning starts with the [AtomCollapse] of the patterns, which records the atoms and the
//! shared variables of the patterns. The [PlanGenerator] then greedily picks seed patterns and
//! joins with two [RuleChain]s and annotates the resulting [QueryPlan] with memory budgets.

mod collapse;
mod estimate;
mod join_graph;
mod memory;
mod plan;
mod planner;
pub mod rules;

pub use collapse::{AtomCollapse, CollapseEdge, CollapseItem, CollapseNode, EdgeLabel, SapId};
pub use estimate::estimate_plan;
pub use memory::assign_memory;
pub use plan::{FilterExpression, PlanNode, PlanOperator, QueryPlan, VariableFilter};
pub use planner::{PlanGenerator, PlannerConfig, DEFAULT_MEMORY_BUDGET};
pub use rules::{RuleChain, TieBreak};
