use crate::index::Index;
use rdf_bucket_common::{CardinalityEstimator, CorruptionError, EngineResult};
use rdf_bucket_model::{TriplePattern, TriplePosition};

const TOTAL_KEY: &[u8] = b"s:total";

/// Summarizes the distribution of atoms over the triple positions.
///
/// The numbers are derived from the index and persisted next to it in the key-value store under
/// keys starting with `b's'`.
#[derive(Debug, Clone)]
pub struct Statistics {
    index: Index,
    total: u64,
    distinct: [u64; 3],
}

impl Statistics {
    /// Computes the statistics with one pass over the index and persists them.
    pub fn build(index: &Index) -> EngineResult<Self> {
        let mut total = 0u64;
        let mut distinct = [0u64; 3];
        for entry in index.cursor() {
            let (_, payload) = entry?;
            total += payload.count(TriplePosition::Subject);
            for position in TriplePosition::ALL {
                if payload.range(position).is_some() {
                    distinct[position.index()] += 1;
                }
            }
        }

        let store = index.store();
        store.put(TOTAL_KEY, &total.to_le_bytes());
        for position in TriplePosition::ALL {
            store.put(
                &distinct_key(position),
                &distinct[position.index()].to_le_bytes(),
            );
        }

        tracing::debug!(
            "Built statistics: {total} triples, {} subjects, {} predicates, {} objects",
            distinct[0],
            distinct[1],
            distinct[2]
        );
        Ok(Self {
            index: index.clone(),
            total,
            distinct,
        })
    }

    /// Loads previously built statistics.
    pub fn open(index: &Index) -> EngineResult<Self> {
        let store = index.store();
        let total = read_counter(store.get(TOTAL_KEY), "total")?;
        let mut distinct = [0u64; 3];
        for position in TriplePosition::ALL {
            distinct[position.index()] =
                read_counter(store.get(&distinct_key(position)), "distinct")?;
        }
        Ok(Self {
            index: index.clone(),
            total,
            distinct,
        })
    }

    /// The number of stored triples.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The number of distinct atoms in `position`.
    pub fn distinct(&self, position: TriplePosition) -> u64 {
        self.distinct[position.index()]
    }
}

impl CardinalityEstimator for Statistics {
    fn estimate_pattern(&self, pattern: &TriplePattern) -> u64 {
        let atoms = pattern.atoms();
        if atoms.is_empty() {
            return self.total;
        }

        let mut counts = Vec::with_capacity(atoms.len());
        for (position, atom) in atoms {
            match self.index.payload(atom) {
                Ok(payload) => counts.push((position, payload.count(position))),
                Err(error) => {
                    tracing::debug!("No estimate for {pattern}: {error}");
                    return 0;
                }
            }
        }

        let Some(&(min_position, min_count)) = counts.iter().min_by_key(|(_, count)| *count)
        else {
            return self.total;
        };
        if min_count == 0 {
            return 0;
        }

        let estimate = counts
            .iter()
            .filter(|(position, _)| *position != min_position)
            .fold(min_count, |estimate, (position, _)| {
                estimate / self.distinct(*position).max(1)
            });
        estimate.max(1)
    }

    fn estimate_join(
        &self,
        left: u64,
        right: u64,
        positions: &[(TriplePosition, TriplePosition)],
    ) -> u64 {
        let divisor = positions
            .iter()
            .map(|(l, r)| self.distinct(*l).max(self.distinct(*r)))
            .max()
            .unwrap_or(1)
            .max(1);
        left.saturating_mul(right) / divisor
    }
}

fn distinct_key(position: TriplePosition) -> Vec<u8> {
    format!("s:distinct:{position}").into_bytes()
}

fn read_counter(value: Option<Vec<u8>>, name: &str) -> EngineResult<u64> {
    let value =
        value.ok_or_else(|| CorruptionError::msg(format!("Statistic '{name}' is missing.")))?;
    let bytes: [u8; 8] = value.as_slice().try_into().map_err(|_| {
        CorruptionError::msg(format!("Statistic '{name}' has {} bytes.", value.len()))
    })?;
    Ok(u64::from_le_bytes(bytes))
}
