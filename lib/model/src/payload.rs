use crate::TriplePosition;

/// The location of one atom within the three position-sorted buckets.
///
/// For every position, `start` is the offset (in records) of the first record whose primary
/// value is the atom and `count` the length of the contiguous run. A start of `-1` denotes that
/// the atom never occurs in that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexPayload {
    pub s_start: i64,
    pub s_count: i64,
    pub p_start: i64,
    pub p_count: i64,
    pub o_start: i64,
    pub o_count: i64,
}

impl IndexPayload {
    /// The payload of an atom that occurs in no position.
    pub const ABSENT: IndexPayload = IndexPayload {
        s_start: -1,
        s_count: 0,
        p_start: -1,
        p_count: 0,
        o_start: -1,
        o_count: 0,
    };

    /// Returns `(start, count)` for `position`, or `None` if the atom is absent there.
    pub fn range(&self, position: TriplePosition) -> Option<(u64, u64)> {
        let (start, count) = self.raw(position);
        let start = u64::try_from(start).ok()?;
        let count = u64::try_from(count).ok()?;
        Some((start, count))
    }

    /// Returns the number of records with the atom in `position`.
    pub fn count(&self, position: TriplePosition) -> u64 {
        self.range(position).map_or(0, |(_, count)| count)
    }

    /// Sets the run for `position`.
    pub fn set(&mut self, position: TriplePosition, start: i64, count: i64) {
        match position {
            TriplePosition::Subject => {
                self.s_start = start;
                self.s_count = count;
            }
            TriplePosition::Predicate => {
                self.p_start = start;
                self.p_count = count;
            }
            TriplePosition::Object => {
                self.o_start = start;
                self.o_count = count;
            }
        }
    }

    /// The six fields in their on-disk order.
    pub fn to_array(&self) -> [i64; 6] {
        [
            self.s_start,
            self.s_count,
            self.p_start,
            self.p_count,
            self.o_start,
            self.o_count,
        ]
    }

    pub fn from_array(
        [s_start, s_count, p_start, p_count, o_start, o_count]: [i64; 6],
    ) -> Self {
        Self {
            s_start,
            s_count,
            p_start,
            p_count,
            o_start,
            o_count,
        }
    }

    fn raw(&self, position: TriplePosition) -> (i64, i64) {
        match position {
            TriplePosition::Subject => (self.s_start, self.s_count),
            TriplePosition::Predicate => (self.p_start, self.p_count),
            TriplePosition::Object => (self.o_start, self.o_count),
        }
    }
}

impl Default for IndexPayload {
    fn default() -> Self {
        Self::ABSENT
    }
}
