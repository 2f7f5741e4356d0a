use crate::{Atom, Variable};
use std::fmt::{Display, Formatter};

/// The assignment of one variable to one atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Binding {
    pub variable: Variable,
    pub atom: Atom,
}

impl Binding {
    pub fn new(variable: Variable, atom: Atom) -> Self {
        Self { variable, atom }
    }
}

/// A mapping from variables to atoms with unique keys.
///
/// The bindings are kept sorted by variable such that the derived equality is set equality over
/// the `(variable, atom)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingSet(Vec<Binding>);

impl BindingSet {
    /// Creates an empty [BindingSet].
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates an empty [BindingSet] with room for `capacity` bindings.
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// Binds `variable` to `atom`, returning the previous value if there was one.
    pub fn insert(&mut self, variable: Variable, atom: Atom) -> Option<Atom> {
        match self.0.binary_search_by_key(&variable, |b| b.variable) {
            Ok(idx) => Some(std::mem::replace(&mut self.0[idx].atom, atom)),
            Err(idx) => {
                self.0.insert(idx, Binding::new(variable, atom));
                None
            }
        }
    }

    /// Returns the atom bound to `variable`.
    pub fn get(&self, variable: Variable) -> Option<Atom> {
        self.0
            .binary_search_by_key(&variable, |b| b.variable)
            .ok()
            .map(|idx| self.0[idx].atom)
    }

    pub fn contains(&self, variable: Variable) -> bool {
        self.get(variable).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the bindings in ascending variable order.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.0.iter()
    }

    /// Returns the bound variables in ascending order.
    pub fn variables(&self) -> Vec<Variable> {
        self.0.iter().map(|b| b.variable).collect()
    }

    /// Merges two compatible binding sets.
    ///
    /// Returns `None` if a variable is bound to different atoms in `self` and `other`.
    pub fn merge(&self, other: &BindingSet) -> Option<BindingSet> {
        let mut result = Vec::with_capacity(self.0.len() + other.0.len());
        let mut lhs = self.0.iter().peekable();
        let mut rhs = other.0.iter().peekable();
        loop {
            match (lhs.peek(), rhs.peek()) {
                (Some(l), Some(r)) => match l.variable.cmp(&r.variable) {
                    std::cmp::Ordering::Less => {
                        result.push(**l);
                        lhs.next();
                    }
                    std::cmp::Ordering::Greater => {
                        result.push(**r);
                        rhs.next();
                    }
                    std::cmp::Ordering::Equal => {
                        if l.atom != r.atom {
                            return None;
                        }
                        result.push(**l);
                        lhs.next();
                        rhs.next();
                    }
                },
                (Some(l), None) => {
                    result.push(**l);
                    lhs.next();
                }
                (None, Some(r)) => {
                    result.push(**r);
                    rhs.next();
                }
                (None, None) => break,
            }
        }
        Some(BindingSet(result))
    }

    /// Keeps only the bindings of `variables`.
    pub fn project(&self, variables: &[Variable]) -> BindingSet {
        BindingSet(
            self.0
                .iter()
                .filter(|b| variables.contains(&b.variable))
                .copied()
                .collect(),
        )
    }

    /// Returns the values of `variables` in the given order, or `None` if one is unbound.
    pub fn values_of(&self, variables: &[Variable]) -> Option<Vec<Atom>> {
        variables.iter().map(|v| self.get(*v)).collect()
    }
}

impl FromIterator<Binding> for BindingSet {
    fn from_iter<T: IntoIterator<Item = Binding>>(iter: T) -> Self {
        let mut result = BindingSet::new();
        for binding in iter {
            result.insert(binding.variable, binding.atom);
        }
        result
    }
}

impl FromIterator<(Variable, Atom)> for BindingSet {
    fn from_iter<T: IntoIterator<Item = (Variable, Atom)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(variable, atom)| Binding::new(variable, atom))
            .collect()
    }
}

impl Display for BindingSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, binding) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", binding.variable, binding.atom)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(i64, i64)]) -> BindingSet {
        pairs
            .iter()
            .map(|(v, a)| (Variable(*v), Atom(*a)))
            .collect()
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let mut lhs = BindingSet::new();
        lhs.insert(Variable(2), Atom(20));
        lhs.insert(Variable(1), Atom(10));
        assert_eq!(lhs, set(&[(1, 10), (2, 20)]));
    }

    #[test]
    fn insert_replaces_value() {
        let mut bindings = set(&[(1, 10)]);
        assert_eq!(bindings.insert(Variable(1), Atom(11)), Some(Atom(10)));
        assert_eq!(bindings.get(Variable(1)), Some(Atom(11)));
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn merge_compatible() {
        let merged = set(&[(1, 10), (3, 30)]).merge(&set(&[(1, 10), (2, 20)]));
        assert_eq!(merged, Some(set(&[(1, 10), (2, 20), (3, 30)])));
    }

    #[test]
    fn merge_conflicting() {
        assert_eq!(set(&[(1, 10)]).merge(&set(&[(1, 11)])), None);
    }

    #[test]
    fn values_of_unbound_is_none() {
        let bindings = set(&[(1, 10), (2, 20)]);
        assert_eq!(
            bindings.values_of(&[Variable(2), Variable(1)]),
            Some(vec![Atom(20), Atom(10)])
        );
        assert_eq!(bindings.values_of(&[Variable(3)]), None);
        assert_eq!(bindings.project(&[Variable(2)]), set(&[(2, 20)]));
    }
}
