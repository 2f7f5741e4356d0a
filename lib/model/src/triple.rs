use crate::{Atom, BindingSet, BucketOrder, TripleItem, TriplePosition, Variable};
use std::fmt::{Display, Formatter};

/// An ordered `(subject, predicate, object)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple<T> {
    pub subject: T,
    pub predicate: T,
    pub object: T,
}

/// A stored triple where every position is an atom.
pub type EncodedTriple = Triple<Atom>;

/// A simple access pattern (SAP): a triple used as a query pattern.
pub type TriplePattern = Triple<TripleItem>;

impl<T: Copy> Triple<T> {
    pub fn new(subject: impl Into<T>, predicate: impl Into<T>, object: impl Into<T>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Returns the element at `position`.
    pub fn get(&self, position: TriplePosition) -> T {
        match position {
            TriplePosition::Subject => self.subject,
            TriplePosition::Predicate => self.predicate,
            TriplePosition::Object => self.object,
        }
    }

    /// Returns the elements in SPO order.
    pub fn to_array(&self) -> [T; 3] {
        [self.subject, self.predicate, self.object]
    }

    /// Builds a triple from an SPO array.
    pub fn from_array([subject, predicate, object]: [T; 3]) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Returns the elements in the sort order of a bucket.
    pub fn reorder(&self, order: BucketOrder) -> [T; 3] {
        order.inner().map(|position| self.get(position))
    }
}

impl EncodedTriple {
    /// Creates a triple from raw atom ids.
    pub fn from_ids(subject: i64, predicate: i64, object: i64) -> Self {
        Self {
            subject: Atom(subject),
            predicate: Atom(predicate),
            object: Atom(object),
        }
    }
}

impl TriplePattern {
    /// Returns all atoms of the pattern together with their position.
    pub fn atoms(&self) -> Vec<(TriplePosition, Atom)> {
        TriplePosition::ALL
            .into_iter()
            .filter_map(|position| self.get(position).as_atom().map(|atom| (position, atom)))
            .collect()
    }

    /// Returns the distinct variables of the pattern in SPO order.
    pub fn variables(&self) -> Vec<Variable> {
        let mut result = Vec::with_capacity(3);
        for item in self.to_array() {
            if let TripleItem::Variable(variable) = item {
                if !result.contains(&variable) {
                    result.push(variable);
                }
            }
        }
        result
    }

    /// Returns the positions in which `variable` occurs.
    pub fn positions_of(&self, variable: Variable) -> Vec<TriplePosition> {
        TriplePosition::ALL
            .into_iter()
            .filter(|position| self.get(*position) == TripleItem::Variable(variable))
            .collect()
    }

    /// Returns the number of atom positions.
    pub fn atom_count(&self) -> usize {
        self.to_array().iter().filter(|item| item.is_atom()).count()
    }

    pub fn is_all_variables(&self) -> bool {
        self.atom_count() == 0
    }

    /// Computes the "scan score" of reading this pattern from a bucket sorted by `order`.
    ///
    /// The score is the number of leading positions of `order` that hold an atom. The higher the
    /// score, the smaller the range of the bucket that must be read.
    pub fn scan_score(&self, order: BucketOrder) -> usize {
        order
            .inner()
            .iter()
            .take_while(|position| self.get(**position).is_atom())
            .count()
    }

    /// Returns the bucket orders that can serve this pattern, best first.
    ///
    /// Only buckets whose primary position is an atom can be read through the index. A pattern
    /// without atoms is served by a full scan of the SPO bucket. Ties prefer the SPO bucket.
    pub fn access_orders(&self) -> Vec<BucketOrder> {
        let mut orders = BucketOrder::ALL
            .into_iter()
            .filter(|order| self.scan_score(*order) > 0)
            .collect::<Vec<_>>();
        if orders.is_empty() {
            return vec![BucketOrder::SPO];
        }
        orders.sort_by_key(|order| std::cmp::Reverse(self.scan_score(*order)));
        orders
    }

    /// Returns the variables in the order in which a scan of `order` produces them sorted.
    pub fn sort_order(&self, order: BucketOrder) -> Vec<Variable> {
        let mut result = Vec::with_capacity(3);
        for position in order.inner() {
            if let TripleItem::Variable(variable) = self.get(*position) {
                if !result.contains(&variable) {
                    result.push(variable);
                }
            }
        }
        result
    }

    /// Checks whether `triple` matches the pattern.
    ///
    /// Atoms must be equal and a variable that occurs more than once must be bound to the same
    /// atom in all of its positions.
    pub fn matches(&self, triple: &EncodedTriple) -> bool {
        let pattern = self.to_array();
        let values = triple.to_array();
        pattern
            .iter()
            .zip(values)
            .enumerate()
            .all(|(i, (item, value))| match item {
                TripleItem::Atom(atom) => *atom == value,
                TripleItem::Variable(_) => pattern[i + 1..]
                    .iter()
                    .zip(&values[i + 1..])
                    .all(|(other, other_value)| other != item || *other_value == value),
            })
    }

    /// Binds the variables of the pattern to the values of `triple`.
    ///
    /// Returns `None` if the triple does not match.
    pub fn bind(&self, triple: &EncodedTriple) -> Option<BindingSet> {
        if !self.matches(triple) {
            return None;
        }

        let mut bindings = BindingSet::new();
        for position in TriplePosition::ALL {
            if let TripleItem::Variable(variable) = self.get(position) {
                bindings.insert(variable, triple.get(position));
            }
        }
        Some(bindings)
    }
}

impl<T: Display> Display for Triple<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.subject, self.predicate, self.object)
    }
}
