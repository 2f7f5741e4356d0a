use itertools::Itertools;
use rdf_bucket_common::{EngineError, EngineResult};
use rdf_bucket_model::{Atom, BucketOrder, TriplePattern, Variable};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// A predicate over the value of a single variable.
#[derive(Debug, Clone)]
pub enum FilterExpression {
    Equals(Atom),
    NotEquals(Atom),
    OneOf(Vec<Atom>),
    /// Matches the dictionary text of the atom.
    Matches(Regex),
}

impl PartialEq for FilterExpression {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Equals(lhs), Self::Equals(rhs))
            | (Self::NotEquals(lhs), Self::NotEquals(rhs)) => lhs == rhs,
            (Self::OneOf(lhs), Self::OneOf(rhs)) => lhs == rhs,
            (Self::Matches(lhs), Self::Matches(rhs)) => lhs.as_str() == rhs.as_str(),
            _ => false,
        }
    }
}

impl Eq for FilterExpression {}

impl Display for FilterExpression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterExpression::Equals(atom) => write!(f, "= {atom}"),
            FilterExpression::NotEquals(atom) => write!(f, "!= {atom}"),
            FilterExpression::OneOf(atoms) => write!(f, "in ({})", atoms.iter().join(", ")),
            FilterExpression::Matches(regex) => write!(f, "matches /{}/", regex.as_str()),
        }
    }
}

/// Attaches a [FilterExpression] to a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableFilter {
    pub variable: Variable,
    pub expression: FilterExpression,
}

impl VariableFilter {
    pub fn new(variable: Variable, expression: FilterExpression) -> Self {
        Self {
            variable,
            expression,
        }
    }
}

impl Display for VariableFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.variable, self.expression)
    }
}

/// The kind of a [PlanOperator] together with its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    /// Reads the triples matching `pattern` from the bucket sorted by `order`.
    Scan {
        pattern: TriplePattern,
        order: BucketOrder,
    },
    /// Sorts its input by `sort_order`. Only the variables of the sort order survive.
    Sort {
        input: Box<PlanOperator>,
        sort_order: Vec<Variable>,
    },
    /// Merges two inputs that are both sorted by `join_variables`.
    MergeJoin {
        left: Box<PlanOperator>,
        right: Box<PlanOperator>,
        join_variables: Vec<Variable>,
    },
    /// Joins two inputs on `join_variables` by partitioning them by a hash.
    HashJoin {
        left: Box<PlanOperator>,
        right: Box<PlanOperator>,
        join_variables: Vec<Variable>,
    },
    /// Drops the binding sets that violate one of the filters.
    Filter {
        input: Box<PlanOperator>,
        filters: Vec<VariableFilter>,
    },
}

/// One node of a descriptive query plan, annotated with its memory budget in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOperator {
    pub node: PlanNode,
    pub memory_budget: u32,
}

impl PlanOperator {
    pub fn new(node: PlanNode) -> Self {
        Self {
            node,
            memory_budget: 0,
        }
    }

    pub fn scan(pattern: TriplePattern, order: BucketOrder) -> Self {
        Self::new(PlanNode::Scan { pattern, order })
    }

    pub fn sort(input: PlanOperator, sort_order: Vec<Variable>) -> Self {
        Self::new(PlanNode::Sort {
            input: Box::new(input),
            sort_order,
        })
    }

    pub fn merge_join(
        left: PlanOperator,
        right: PlanOperator,
        join_variables: Vec<Variable>,
    ) -> Self {
        Self::new(PlanNode::MergeJoin {
            left: Box::new(left),
            right: Box::new(right),
            join_variables,
        })
    }

    pub fn hash_join(
        left: PlanOperator,
        right: PlanOperator,
        join_variables: Vec<Variable>,
    ) -> Self {
        Self::new(PlanNode::HashJoin {
            left: Box::new(left),
            right: Box::new(right),
            join_variables,
        })
    }

    /// Returns the inputs of the operator.
    pub fn children(&self) -> Vec<&PlanOperator> {
        match &self.node {
            PlanNode::Scan { .. } => Vec::new(),
            PlanNode::Sort { input, .. } | PlanNode::Filter { input, .. } => vec![input.as_ref()],
            PlanNode::MergeJoin { left, right, .. } | PlanNode::HashJoin { left, right, .. } => {
                vec![left.as_ref(), right.as_ref()]
            }
        }
    }

    /// Returns the variables bound by the results of this operator in ascending order.
    pub fn variables(&self) -> Vec<Variable> {
        let variables: BTreeSet<Variable> = match &self.node {
            PlanNode::Scan { pattern, .. } => pattern.variables().into_iter().collect(),
            PlanNode::Sort { sort_order, .. } => sort_order.iter().copied().collect(),
            PlanNode::Filter { input, .. } => return input.variables(),
            PlanNode::MergeJoin { left, right, .. } | PlanNode::HashJoin { left, right, .. } => {
                left.variables()
                    .into_iter()
                    .chain(right.variables())
                    .collect()
            }
        };
        variables.into_iter().collect()
    }

    /// Returns the variables by which the results of this operator are sorted.
    pub fn sort_order(&self) -> Vec<Variable> {
        match &self.node {
            PlanNode::Scan { pattern, order } => pattern.sort_order(*order),
            PlanNode::Sort { sort_order, .. } => sort_order.clone(),
            PlanNode::MergeJoin { join_variables, .. } => join_variables.clone(),
            PlanNode::HashJoin { .. } => Vec::new(),
            PlanNode::Filter { input, .. } => input.sort_order(),
        }
    }

    /// Returns the patterns of all scans below this operator.
    pub fn patterns(&self) -> Vec<TriplePattern> {
        match &self.node {
            PlanNode::Scan { pattern, .. } => vec![*pattern],
            _ => self
                .children()
                .into_iter()
                .flat_map(PlanOperator::patterns)
                .collect(),
        }
    }

    /// Returns true if this operator is a scan.
    pub fn is_scan(&self) -> bool {
        matches!(self.node, PlanNode::Scan { .. })
    }

    fn fmt_indented(&self, f: &mut Formatter<'_>, depth: usize) -> std::fmt::Result {
        let indent = "  ".repeat(depth);
        match &self.node {
            PlanNode::Scan { pattern, order } => write!(f, "{indent}Scan[{order}] {pattern}")?,
            PlanNode::Sort { sort_order, .. } => {
                write!(f, "{indent}Sort [{}]", sort_order.iter().join(", "))?
            }
            PlanNode::MergeJoin { join_variables, .. } => write!(
                f,
                "{indent}MergeJoin on [{}]",
                join_variables.iter().join(", ")
            )?,
            PlanNode::HashJoin { join_variables, .. } => write!(
                f,
                "{indent}HashJoin on [{}]",
                join_variables.iter().join(", ")
            )?,
            PlanNode::Filter { filters, .. } => {
                write!(f, "{indent}Filter [{}]", filters.iter().join(", "))?
            }
        }
        if self.memory_budget > 0 {
            write!(f, " mem={}", self.memory_budget)?;
        }
        writeln!(f)?;

        for child in self.children() {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl Display for PlanOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// The plan of a query. Built by the [PlanGenerator](crate::PlanGenerator) and translated into
/// physical operators for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    root: PlanOperator,
}

impl QueryPlan {
    pub fn new(root: PlanOperator) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &PlanOperator {
        &self.root
    }

    pub fn into_root(self) -> PlanOperator {
        self.root
    }

    /// Returns the variables bound by the results of the plan.
    pub fn variables(&self) -> Vec<Variable> {
        self.root.variables()
    }

    /// Wraps the root of the plan into a filter.
    pub fn with_filters(self, filters: Vec<VariableFilter>) -> EngineResult<Self> {
        if filters.is_empty() {
            return Err(EngineError::configuration(
                "A filter needs at least one expression.",
            ));
        }
        Ok(Self {
            root: PlanOperator::new(PlanNode::Filter {
                input: Box::new(self.root),
                filters,
            }),
        })
    }
}

impl Display for QueryPlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.root, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_bucket_model::TripleItem;

    fn atom(id: i64) -> TripleItem {
        Atom(id).into()
    }

    fn var(id: i64) -> TripleItem {
        Variable(id).into()
    }

    #[test]
    fn display_and_sort_orders() {
        let left = PlanOperator::scan(
            TriplePattern::new(atom(1), var(2), var(3)),
            BucketOrder::SPO,
        );
        let right = PlanOperator::scan(
            TriplePattern::new(var(3), atom(4), var(5)),
            BucketOrder::POS,
        );
        let right = PlanOperator::sort(right, vec![Variable(3), Variable(5)]);
        let mut join = PlanOperator::merge_join(left, right, vec![Variable(3)]);
        join.memory_budget = 1024;
        let plan = QueryPlan::new(join)
            .with_filters(vec![VariableFilter::new(
                Variable(2),
                FilterExpression::NotEquals(Atom(9)),
            )])
            .unwrap();

        insta::assert_snapshot!(plan, @r"
        Filter [?v2 != a9]
          MergeJoin on [?v3] mem=1024
            Scan[SPO] (a1 ?v2 ?v3)
            Sort [?v3, ?v5]
              Scan[POS] (?v3 a4 ?v5)
        ");
        assert_eq!(
            plan.variables(),
            vec![Variable(2), Variable(3), Variable(5)]
        );
        assert_eq!(plan.root().sort_order(), vec![Variable(3)]);
    }

    #[test]
    fn scan_sort_order_follows_bucket() {
        let scan = PlanOperator::scan(
            TriplePattern::new(var(1), atom(2), var(3)),
            BucketOrder::POS,
        );
        assert_eq!(scan.sort_order(), vec![Variable(3), Variable(1)]);
        assert_eq!(scan.variables(), vec![Variable(1), Variable(3)]);
    }

    #[test]
    fn empty_filters_are_rejected() {
        let scan = PlanOperator::scan(TriplePattern::new(var(1), var(2), var(3)), BucketOrder::SPO);
        assert!(matches!(
            QueryPlan::new(scan).with_filters(Vec::new()),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn regex_filters_compare_by_pattern() {
        let lhs = FilterExpression::Matches(Regex::new("^ab").unwrap());
        let rhs = FilterExpression::Matches(Regex::new("^ab").unwrap());
        assert_eq!(lhs, rhs);
        assert_eq!(lhs.to_string(), "matches /^ab/");
    }
}
