use rdf_bucket_model::{Atom, TripleItem, TriplePattern, TriplePosition, Variable};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

/// Identifies a pattern by its index in the input of [AtomCollapse::compute].
pub type SapId = usize;

/// The item a [CollapseNode] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollapseItem {
    Atom(Atom),
    Variable(Variable),
    /// Stands in for a pattern without any atoms.
    Placeholder,
}

impl CollapseItem {
    /// Returns true if the node can seed the plan (atoms and placeholders).
    pub fn is_seed(&self) -> bool {
        !matches!(self, CollapseItem::Variable(_))
    }
}

impl Display for CollapseItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CollapseItem::Atom(atom) => write!(f, "{atom}"),
            CollapseItem::Variable(variable) => write!(f, "{variable}"),
            CollapseItem::Placeholder => f.write_str("*"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseNode {
    pub item: CollapseItem,
    pub saps: BTreeSet<SapId>,
}

/// Justifies a join of two patterns: `variable` occurs in `left_position` of the pattern `left`
/// and in `right_position` of the pattern `right`. Always `left < right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeLabel {
    pub left: SapId,
    pub right: SapId,
    pub variable: Variable,
    pub left_position: TriplePosition,
    pub right_position: TriplePosition,
}

impl Display for EdgeLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "S{}.{} = S{}.{} ({})",
            self.left, self.left_position, self.right, self.right_position, self.variable
        )
    }
}

/// Connects two patterns that share at least one variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseEdge {
    pub left: SapId,
    pub right: SapId,
    pub labels: BTreeSet<EdgeLabel>,
}

/// The atom-collapse graph of a basic graph pattern.
///
/// Every atom of a pattern becomes a node of its own while every variable becomes a single node
/// that is shared by all patterns containing it. Two patterns that share a variable are
/// connected by an edge that carries one label per matching pair of variable occurrences.
#[derive(Debug, Clone)]
pub struct AtomCollapse {
    patterns: Vec<TriplePattern>,
    nodes: Vec<CollapseNode>,
    edges: Vec<CollapseEdge>,
}

impl AtomCollapse {
    pub fn compute(patterns: &[TriplePattern]) -> Self {
        let mut nodes = Vec::new();
        let mut variable_nodes = BTreeMap::<Variable, usize>::new();

        for (sap, pattern) in patterns.iter().enumerate() {
            let mut atoms = Vec::with_capacity(3);
            for (_, atom) in pattern.atoms() {
                if !atoms.contains(&atom) {
                    atoms.push(atom);
                }
            }
            if atoms.is_empty() {
                nodes.push(CollapseNode {
                    item: CollapseItem::Placeholder,
                    saps: BTreeSet::from([sap]),
                });
            }
            for atom in atoms {
                nodes.push(CollapseNode {
                    item: CollapseItem::Atom(atom),
                    saps: BTreeSet::from([sap]),
                });
            }

            for variable in pattern.variables() {
                match variable_nodes.get(&variable) {
                    Some(index) => {
                        nodes[*index].saps.insert(sap);
                    }
                    None => {
                        variable_nodes.insert(variable, nodes.len());
                        nodes.push(CollapseNode {
                            item: CollapseItem::Variable(variable),
                            saps: BTreeSet::from([sap]),
                        });
                    }
                }
            }
        }

        let mut edges = BTreeMap::<(SapId, SapId), BTreeSet<EdgeLabel>>::new();
        for (left, left_pattern) in patterns.iter().enumerate() {
            for (right, right_pattern) in patterns.iter().enumerate().skip(left + 1) {
                for left_position in TriplePosition::ALL {
                    let TripleItem::Variable(variable) = left_pattern.get(left_position) else {
                        continue;
                    };
                    for right_position in right_pattern.positions_of(variable) {
                        edges.entry((left, right)).or_default().insert(EdgeLabel {
                            left,
                            right,
                            variable,
                            left_position,
                            right_position,
                        });
                    }
                }
            }
        }

        let edges = edges
            .into_iter()
            .map(|((left, right), labels)| CollapseEdge {
                left,
                right,
                labels,
            })
            .collect();

        Self {
            patterns: patterns.to_vec(),
            nodes,
            edges,
        }
    }

    pub fn patterns(&self) -> &[TriplePattern] {
        &self.patterns
    }

    pub fn nodes(&self) -> &[CollapseNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[CollapseEdge] {
        &self.edges
    }

    /// Returns the edge between the patterns `a` and `b`.
    pub fn edge_between(&self, a: SapId, b: SapId) -> Option<&CollapseEdge> {
        let (left, right) = if a < b { (a, b) } else { (b, a) };
        self.edges
            .iter()
            .find(|edge| edge.left == left && edge.right == right)
    }
}

impl Display for AtomCollapse {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for node in &self.nodes {
            let saps = node
                .saps
                .iter()
                .map(|sap| format!("S{sap}"))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "Node {} {{{saps}}}", node.item)?;
        }
        for edge in &self.edges {
            let labels = edge
                .labels
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "Edge S{} - S{}: {labels}", edge.left, edge.right)?;
        }
        Ok(())
    }
}
