use crate::collapse::{AtomCollapse, SapId};
use crate::estimate::estimate_plan;
use crate::join_graph::{EdgeId, JoinGraph, JoinNode};
use crate::memory::assign_memory;
use crate::plan::{PlanNode, PlanOperator, QueryPlan};
use crate::rules::{join_chain, seed_chain, JoinCandidate, RuleChain, SeedCandidate, TieBreak};
use itertools::Itertools;
use rdf_bucket_common::{CardinalityEstimator, EngineError, EngineResult};
use rdf_bucket_model::{BucketOrder, TriplePattern, Variable};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::debug;

/// The default amount of memory distributed over the operators of a plan (64 MiB).
pub const DEFAULT_MEMORY_BUDGET: u64 = 64 * 1024 * 1024;

/// Tunes the [PlanGenerator].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// The number of bytes distributed over the operators of a plan.
    pub memory_budget: u64,
    /// The terminal rule of both rule chains.
    pub tie_break: TieBreak,
    /// Sort the inputs of joins that cannot be merge-joined directly instead of hash-joining them.
    pub sort_merge_joins: bool,
    /// Seeds the random tie break. `None` seeds from the OS.
    pub random_seed: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            memory_budget: DEFAULT_MEMORY_BUDGET,
            tie_break: TieBreak::default(),
            sort_merge_joins: false,
            random_seed: None,
        }
    }
}

impl PlannerConfig {
    #[must_use]
    pub fn with_memory_budget(mut self, memory_budget: u64) -> Self {
        self.memory_budget = memory_budget;
        self
    }

    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    #[must_use]
    pub fn with_sort_merge_joins(mut self, sort_merge_joins: bool) -> Self {
        self.sort_merge_joins = sort_merge_joins;
        self
    }

    #[must_use]
    pub fn with_random_seed(mut self, random_seed: Option<u64>) -> Self {
        self.random_seed = random_seed;
        self
    }
}

/// Builds [QueryPlan]s for basic graph patterns.
///
/// The generator first covers the patterns with seeds, picking one pattern after the other with
/// the seed rule chain and preferring patterns that share a variable with the seeds chosen so
/// far. Every seed becomes a scan in the join graph. The join rule chain then repeatedly picks an
/// edge of the join graph and replaces its endpoints with a join until a single node remains.
pub struct PlanGenerator {
    config: PlannerConfig,
    estimator: Option<Arc<dyn CardinalityEstimator + Send + Sync>>,
    seed_chain: RuleChain<SeedCandidate>,
    join_chain: RuleChain<JoinCandidate>,
}

impl PlanGenerator {
    pub fn new(config: PlannerConfig) -> Self {
        let seed = config.random_seed;
        Self {
            seed_chain: seed_chain(config.tie_break, seed),
            join_chain: join_chain(config.tie_break, seed.map(|seed| seed.wrapping_add(1))),
            config,
            estimator: None,
        }
    }

    /// Lets the cardinality rules use `estimator`.
    #[must_use]
    pub fn with_estimator(
        mut self,
        estimator: Arc<dyn CardinalityEstimator + Send + Sync>,
    ) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plans the conjunction of `patterns`.
    pub fn generate(&mut self, patterns: &[TriplePattern]) -> EngineResult<QueryPlan> {
        if patterns.is_empty() {
            return Err(EngineError::configuration(
                "Cannot plan a query without patterns.",
            ));
        }

        let collapse = AtomCollapse::compute(patterns);
        let seeds = self.choose_seeds(&collapse);
        let mut graph = build_join_graph(&collapse, &seeds);

        while graph.alive_nodes().len() > 1 {
            self.join_next(&mut graph)?;
        }

        let mut root = graph
            .alive_nodes()
            .first()
            .map(|node| graph.node(*node).operator.clone())
            .ok_or_else(|| EngineError::configuration("The join graph has no root."))?;
        assign_memory(&mut root, self.config.memory_budget);
        Ok(QueryPlan::new(root))
    }

    /// Orders the patterns by the seed rule chain.
    fn choose_seeds(&mut self, collapse: &AtomCollapse) -> Vec<SapId> {
        let patterns = collapse.patterns();
        let mut nodes = collapse.nodes().to_vec();
        let mut todo = (0..patterns.len()).collect::<BTreeSet<_>>();
        let mut frontier = Vec::<SapId>::new();
        let mut seeds = Vec::with_capacity(patterns.len());

        while !todo.is_empty() {
            let mut seen = BTreeSet::new();
            let all = nodes
                .iter()
                .enumerate()
                .filter(|(_, node)| node.item.is_seed())
                .flat_map(|(index, node)| node.saps.iter().map(move |sap| (index, *sap)))
                .filter(|(_, sap)| seen.insert(*sap))
                .collect::<Vec<_>>();
            let connected = all
                .iter()
                .filter(|(_, sap)| frontier.contains(sap))
                .copied()
                .collect::<Vec<_>>();
            let reachable = if connected.is_empty() { all } else { connected };

            let candidates = reachable
                .into_iter()
                .map(|(node, sap)| SeedCandidate {
                    node,
                    sap,
                    pattern: patterns[sap],
                    estimate: self
                        .estimator
                        .as_ref()
                        .map(|estimator| estimator.estimate_pattern(&patterns[sap])),
                })
                .collect::<Vec<_>>();
            let Some(chosen) = self.seed_chain.select(candidates) else {
                break;
            };
            debug!("Chose seed S{} {}", chosen.sap, chosen.pattern);

            let sap = chosen.sap;
            todo.remove(&sap);
            frontier.retain(|other| *other != sap);
            seeds.push(sap);
            for node in &nodes {
                if node.item.is_seed() || !node.saps.contains(&sap) {
                    continue;
                }
                for other in &node.saps {
                    if *other != sap && todo.contains(other) && !frontier.contains(other) {
                        frontier.push(*other);
                    }
                }
            }

            for node in &mut nodes {
                node.saps.remove(&sap);
            }
            nodes.retain(|node| !node.saps.is_empty());
        }
        seeds
    }

    /// Replaces two nodes of the join graph with their join.
    fn join_next(&mut self, graph: &mut JoinGraph) -> EngineResult<()> {
        let edges = graph.alive_edges();
        if edges.is_empty() {
            let [a, b, ..] = graph.alive_nodes()[..] else {
                return Err(EngineError::configuration("Nothing left to join."));
            };
            let left = graph.node(a).operator.clone();
            let right = graph.node(b).operator.clone();
            debug!(
                "Cross product of {:?} and {:?}",
                graph.node(a).saps,
                graph.node(b).saps
            );
            graph.merge_nodes(a, b, PlanOperator::hash_join(left, right, Vec::new()));
            return Ok(());
        }

        let candidates = edges
            .into_iter()
            .map(|edge| self.join_candidate(graph, edge))
            .collect::<Vec<_>>();
        let chosen = self
            .join_chain
            .select(candidates)
            .ok_or_else(|| EngineError::configuration("No join candidate was chosen."))?;

        let edge = graph.edge(chosen.edge);
        let operator = self.join_operator(graph.node(edge.left), graph.node(edge.right));
        graph.merge_edge(chosen.edge, operator);
        Ok(())
    }

    fn join_candidate(&self, graph: &JoinGraph, id: EdgeId) -> JoinCandidate {
        let edge = graph.edge(id);
        let left = graph.node(edge.left);
        let right = graph.node(edge.right);

        let atoms = left
            .operator
            .patterns()
            .iter()
            .chain(right.operator.patterns().iter())
            .map(TriplePattern::atom_count)
            .sum();
        let estimate = self.estimator.as_deref().map(|estimator| {
            let positions = edge
                .labels
                .iter()
                .map(|label| (label.left_position, label.right_position))
                .collect::<Vec<_>>();
            estimator.estimate_join(
                estimate_plan(&left.operator, estimator),
                estimate_plan(&right.operator, estimator),
                &positions,
            )
        });

        JoinCandidate {
            edge: id,
            labels: edge.labels.iter().copied().collect(),
            atoms,
            merge_feasible: merge_inputs(left, right).is_some(),
            estimate,
        }
    }

    /// Decides how `left` and `right` are joined.
    fn join_operator(&self, left: &JoinNode, right: &JoinNode) -> PlanOperator {
        if let Some((left, right, key)) = merge_inputs(left, right) {
            debug!("Merge join on [{}]", key.iter().join(", "));
            return PlanOperator::merge_join(left, right, key);
        }

        let shared = shared_variables(&left.operator, &right.operator);
        if self.config.sort_merge_joins && !shared.is_empty() {
            debug!("Sort-merge join on [{}]", shared.iter().join(", "));
            return PlanOperator::merge_join(
                sorted_by(left.operator.clone(), &shared),
                sorted_by(right.operator.clone(), &shared),
                shared,
            );
        }

        debug!("Hash join on [{}]", shared.iter().join(", "));
        PlanOperator::hash_join(left.operator.clone(), right.operator.clone(), shared)
    }
}

impl Debug for PlanGenerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanGenerator")
            .field("config", &self.config)
            .field("has_estimator", &self.estimator.is_some())
            .field("seed_rules", &self.seed_chain.rule_names())
            .field("join_rules", &self.join_chain.rule_names())
            .finish()
    }
}

/// Creates one scan node per seed and connects the nodes with the atom-collapse edges.
fn build_join_graph(collapse: &AtomCollapse, seeds: &[SapId]) -> JoinGraph {
    let mut graph = JoinGraph::default();
    let mut nodes = BTreeMap::new();
    for sap in seeds {
        let pattern = collapse.patterns()[*sap];
        let orders = pattern.access_orders();
        let order = orders.first().copied().unwrap_or(BucketOrder::SPO);
        let node = graph.add_node(
            BTreeSet::from([*sap]),
            PlanOperator::scan(pattern, order),
            orders,
        );
        nodes.insert(*sap, node);
    }

    for edge in collapse.edges() {
        if let (Some(left), Some(right)) = (nodes.get(&edge.left), nodes.get(&edge.right)) {
            graph.add_edge(*left, *right, edge.labels.iter().copied());
        }
    }
    graph
}

/// Returns the inputs and the key of a merge join of `left` and `right` without sorting.
///
/// Leaf scans may read from any of their alternative buckets. The longest common prefix of the
/// sort orders wins; ties keep the first combination.
fn merge_inputs(
    left: &JoinNode,
    right: &JoinNode,
) -> Option<(PlanOperator, PlanOperator, Vec<Variable>)> {
    let mut best: Option<(PlanOperator, PlanOperator, Vec<Variable>)> = None;
    for left in input_options(left) {
        for right in input_options(right) {
            let prefix = common_prefix(&left.sort_order(), &right.sort_order());
            let longer = match &best {
                Some((_, _, key)) => prefix.len() > key.len(),
                None => !prefix.is_empty(),
            };
            if longer {
                best = Some((left.clone(), right.clone(), prefix));
            }
        }
    }
    best
}

/// The operators a node could contribute to a join.
fn input_options(node: &JoinNode) -> Vec<PlanOperator> {
    match &node.operator.node {
        PlanNode::Scan { pattern, .. } if !node.scan_orders.is_empty() => node
            .scan_orders
            .iter()
            .map(|order| PlanOperator::scan(*pattern, *order))
            .collect(),
        _ => vec![node.operator.clone()],
    }
}

fn common_prefix(left: &[Variable], right: &[Variable]) -> Vec<Variable> {
    left.iter()
        .zip(right)
        .take_while(|(l, r)| l == r)
        .map(|(l, _)| *l)
        .collect()
}

fn shared_variables(left: &PlanOperator, right: &PlanOperator) -> Vec<Variable> {
    let right = right.variables();
    left.variables()
        .into_iter()
        .filter(|variable| right.contains(variable))
        .collect()
}

/// Sorts `operator` by `key` followed by its remaining variables.
fn sorted_by(operator: PlanOperator, key: &[Variable]) -> PlanOperator {
    let mut sort_order = key.to_vec();
    sort_order.extend(
        operator
            .variables()
            .into_iter()
            .filter(|variable| !key.contains(variable)),
    );
    PlanOperator::sort(operator, sort_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_bucket_model::{Atom, TripleItem};

    fn atom(id: i64) -> TripleItem {
        Atom(id).into()
    }

    fn var(id: i64) -> TripleItem {
        Variable(id).into()
    }

    #[test]
    fn frontier_prefers_connected_seeds() {
        // Without a previous seed every pattern is a candidate.
        let patterns = [
            TriplePattern::new(atom(1), atom(2), var(1)),
            TriplePattern::new(atom(3), atom(4), atom(5)),
            TriplePattern::new(var(1), atom(6), var(2)),
        ];
        let mut generator =
            PlanGenerator::new(PlannerConfig::default().with_tie_break(TieBreak::First));
        let collapse = AtomCollapse::compute(&patterns);
        assert_eq!(generator.choose_seeds(&collapse), vec![1, 0, 2]);

        // S2 is more selective than S1 but does not share a variable with S0.
        let patterns = [
            TriplePattern::new(atom(1), atom(2), var(1)),
            TriplePattern::new(var(1), atom(6), var(2)),
            TriplePattern::new(atom(3), atom(4), var(3)),
        ];
        let collapse = AtomCollapse::compute(&patterns);
        assert_eq!(generator.choose_seeds(&collapse), vec![0, 1, 2]);
    }

    #[test]
    fn merge_inputs_try_alternative_buckets() {
        let mut graph = JoinGraph::default();
        let left_pattern = TriplePattern::new(var(1), atom(2), atom(3));
        let right_pattern = TriplePattern::new(atom(4), atom(5), var(1));
        let left = graph.add_node(
            BTreeSet::from([0]),
            PlanOperator::scan(left_pattern, BucketOrder::POS),
            left_pattern.access_orders(),
        );
        let right = graph.add_node(
            BTreeSet::from([1]),
            PlanOperator::scan(right_pattern, BucketOrder::SPO),
            right_pattern.access_orders(),
        );

        let (left, right, key) = merge_inputs(graph.node(left), graph.node(right)).unwrap();
        assert_eq!(key, vec![Variable(1)]);
        assert!(left.is_scan() && right.is_scan());
    }

    #[test]
    fn sort_key_covers_all_variables() {
        let scan = PlanOperator::scan(
            TriplePattern::new(var(3), atom(1), var(1)),
            BucketOrder::POS,
        );
        let sorted = sorted_by(scan, &[Variable(3)]);
        assert_eq!(sorted.sort_order(), vec![Variable(3), Variable(1)]);
    }
}
