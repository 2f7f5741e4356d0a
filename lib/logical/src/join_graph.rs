use crate::collapse::{EdgeLabel, SapId};
use crate::plan::PlanOperator;
use rdf_bucket_model::BucketOrder;
use std::collections::BTreeSet;

pub(crate) type NodeId = usize;
pub(crate) type EdgeId = usize;

#[derive(Debug, Clone)]
pub(crate) struct JoinNode {
    pub saps: BTreeSet<SapId>,
    pub operator: PlanOperator,
    /// The bucket orders a leaf scan could alternatively read from, best first.
    pub scan_orders: Vec<BucketOrder>,
    alive: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct JoinEdge {
    pub left: NodeId,
    pub right: NodeId,
    pub labels: BTreeSet<EdgeLabel>,
    alive: bool,
}

/// The join graph of the plan generator.
///
/// Nodes and edges live in arenas and are addressed by their index. Merging two nodes marks them
/// dead and appends the merged node; edges that touched the old nodes are redirected.
#[derive(Debug, Clone, Default)]
pub(crate) struct JoinGraph {
    nodes: Vec<JoinNode>,
    edges: Vec<JoinEdge>,
}

impl JoinGraph {
    pub fn add_node(
        &mut self,
        saps: BTreeSet<SapId>,
        operator: PlanOperator,
        scan_orders: Vec<BucketOrder>,
    ) -> NodeId {
        self.nodes.push(JoinNode {
            saps,
            operator,
            scan_orders,
            alive: true,
        });
        self.nodes.len() - 1
    }

    /// Connects `a` and `b`. Labels of an existing edge between the nodes are extended.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId, labels: impl IntoIterator<Item = EdgeLabel>) {
        match self.find_edge(a, b) {
            Some(edge) => self.edges[edge].labels.extend(labels),
            None => self.edges.push(JoinEdge {
                left: a,
                right: b,
                labels: labels.into_iter().collect(),
                alive: true,
            }),
        }
    }

    pub fn node(&self, id: NodeId) -> &JoinNode {
        &self.nodes[id]
    }

    pub fn edge(&self, id: EdgeId) -> &JoinEdge {
        &self.edges[id]
    }

    pub fn alive_nodes(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|id| self.nodes[*id].alive)
            .collect()
    }

    pub fn alive_edges(&self) -> Vec<EdgeId> {
        (0..self.edges.len())
            .filter(|id| self.edges[*id].alive)
            .collect()
    }

    /// Replaces the endpoints of `edge` with one node holding `operator`.
    pub fn merge_edge(&mut self, edge: EdgeId, operator: PlanOperator) -> NodeId {
        self.edges[edge].alive = false;
        let JoinEdge { left, right, .. } = self.edges[edge];
        self.merge_nodes(left, right, operator)
    }

    /// Replaces `a` and `b` with one node holding `operator`.
    pub fn merge_nodes(&mut self, a: NodeId, b: NodeId, operator: PlanOperator) -> NodeId {
        self.nodes[a].alive = false;
        self.nodes[b].alive = false;
        let saps = self.nodes[a]
            .saps
            .union(&self.nodes[b].saps)
            .copied()
            .collect();
        let merged = self.add_node(saps, operator, Vec::new());

        for id in self.alive_edges() {
            let JoinEdge { left, right, .. } = self.edges[id];
            let other = match (left == a || left == b, right == a || right == b) {
                (true, true) => {
                    self.edges[id].alive = false;
                    continue;
                }
                (true, false) => right,
                (false, true) => left,
                (false, false) => continue,
            };

            match self.find_edge(merged, other) {
                Some(existing) => {
                    let labels = std::mem::take(&mut self.edges[id].labels);
                    self.edges[id].alive = false;
                    self.edges[existing].labels.extend(labels);
                }
                None => {
                    self.edges[id].left = merged;
                    self.edges[id].right = other;
                }
            }
        }
        merged
    }

    fn find_edge(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.edges.iter().position(|edge| {
            edge.alive
                && ((edge.left == a && edge.right == b) || (edge.left == b && edge.right == a))
        })
    }
}
