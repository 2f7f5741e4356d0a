use crate::BucketOrderCreationError;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Represents which part of a triple is stored at a given position of a bucket record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TriplePosition {
    /// The subject
    Subject,
    /// The predicate
    Predicate,
    /// The object
    Object,
}

impl TriplePosition {
    /// All positions in SPO order.
    pub const ALL: [TriplePosition; 3] = [
        TriplePosition::Subject,
        TriplePosition::Predicate,
        TriplePosition::Object,
    ];

    /// Returns the index of the position in an SPO triple.
    pub fn index(self) -> usize {
        match self {
            TriplePosition::Subject => 0,
            TriplePosition::Predicate => 1,
            TriplePosition::Object => 2,
        }
    }
}

impl Display for TriplePosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TriplePosition::Subject => write!(f, "S"),
            TriplePosition::Predicate => write!(f, "P"),
            TriplePosition::Object => write!(f, "O"),
        }
    }
}

/// The `(primary, secondary, tertiary)` permutation a bucket is physically sorted by.
///
/// The components are *disjunct*. Use [BucketOrder::try_new] for arbitrary orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketOrder([TriplePosition; 3]);

impl BucketOrder {
    /// Sorted by subject, predicate, object.
    pub const SPO: BucketOrder = BucketOrder([
        TriplePosition::Subject,
        TriplePosition::Predicate,
        TriplePosition::Object,
    ]);

    /// Sorted by predicate, object, subject.
    pub const POS: BucketOrder = BucketOrder([
        TriplePosition::Predicate,
        TriplePosition::Object,
        TriplePosition::Subject,
    ]);

    /// Sorted by object, subject, predicate.
    pub const OSP: BucketOrder = BucketOrder([
        TriplePosition::Object,
        TriplePosition::Subject,
        TriplePosition::Predicate,
    ]);

    /// The three orders that are materialized as buckets, one per primary position.
    pub const ALL: [BucketOrder; 3] = [BucketOrder::SPO, BucketOrder::POS, BucketOrder::OSP];

    /// Tries to create a new [BucketOrder].
    ///
    /// Returns an error if a [TriplePosition] appears more than once.
    pub fn try_new(
        positions: [TriplePosition; 3],
    ) -> Result<Self, BucketOrderCreationError> {
        let distinct = positions.iter().collect::<HashSet<_>>();
        if distinct.len() != positions.len() {
            return Err(BucketOrderCreationError);
        }
        Ok(BucketOrder(positions))
    }

    /// Returns the bucket order whose primary position is `position`.
    pub fn with_primary(position: TriplePosition) -> Self {
        match position {
            TriplePosition::Subject => BucketOrder::SPO,
            TriplePosition::Predicate => BucketOrder::POS,
            TriplePosition::Object => BucketOrder::OSP,
        }
    }

    /// Returns a reference to the inner array.
    pub fn inner(&self) -> &[TriplePosition; 3] {
        &self.0
    }

    pub fn primary(&self) -> TriplePosition {
        self.0[0]
    }

    pub fn secondary(&self) -> TriplePosition {
        self.0[1]
    }

    pub fn tertiary(&self) -> TriplePosition {
        self.0[2]
    }

    /// The SPO indices of the components, in sort order.
    pub fn key_columns(&self) -> [usize; 3] {
        [self.0[0].index(), self.0[1].index(), self.0[2].index()]
    }
}

impl Display for BucketOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for position in &self.0 {
            write!(f, "{position}")?;
        }
        Ok(())
    }
}
