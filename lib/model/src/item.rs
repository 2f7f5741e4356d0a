use std::fmt::{Display, Formatter};

/// An interned constant (IRI, literal, blank node) identified by its dictionary id.
///
/// Two atoms are equal iff their ids are equal. The ids are stable for the lifetime of the
/// database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(pub i64);

impl Atom {
    /// Returns the raw id.
    pub fn id(self) -> i64 {
        self.0
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// A query variable. The id is only meaningful within a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(pub i64);

impl Variable {
    /// Returns the raw id.
    pub fn id(self) -> i64 {
        self.0
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "?v{}", self.0)
    }
}

/// One position of a [TriplePattern](crate::TriplePattern).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TripleItem {
    /// A constant that must match exactly.
    Atom(Atom),
    /// A variable that is bound by matching triples.
    Variable(Variable),
}

impl TripleItem {
    /// Returns the atom if this item is one.
    pub fn as_atom(&self) -> Option<Atom> {
        match self {
            TripleItem::Atom(atom) => Some(*atom),
            TripleItem::Variable(_) => None,
        }
    }

    /// Returns the variable if this item is one.
    pub fn as_variable(&self) -> Option<Variable> {
        match self {
            TripleItem::Atom(_) => None,
            TripleItem::Variable(variable) => Some(*variable),
        }
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, TripleItem::Atom(_))
    }
}

impl From<Atom> for TripleItem {
    fn from(value: Atom) -> Self {
        TripleItem::Atom(value)
    }
}

impl From<Variable> for TripleItem {
    fn from(value: Variable) -> Self {
        TripleItem::Variable(value)
    }
}

impl Display for TripleItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TripleItem::Atom(atom) => write!(f, "{atom}"),
            TripleItem::Variable(variable) => write!(f, "{variable}"),
        }
    }
}
