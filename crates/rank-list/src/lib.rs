//! Rank List
//!
//! Keeps the best `capacity` scored offsets in strict order. Scores compare by
//! interval mean and equal means keep the lower offset ahead. Once full, the
//! worst admitted mean acts as a rejection threshold so callers can skip
//! non-improving candidates without touching the list.

use std::cmp::Ordering;

use fracterval::Fru128;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors while building a rank list
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RankError {
    /// A list must hold at least one entry
    #[error("Rank list capacity must be nonzero")]
    ZeroCapacity,

    /// Storage could not be reserved
    #[error("Failed to allocate {0} rank list entries")]
    AllocationFailed(usize),
}

/// Ordering of admitted scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankOrder {
    /// Smallest scores first
    #[default]
    Ascending,
    /// Largest scores first
    Descending,
    /// Every score in arrival order, no ranking
    Unranked,
}

/// One admitted score and the sweep offset it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub score: Fru128,
    pub offset: u64,
}

impl RankEntry {
    #[inline]
    fn key_cmp(&self, mean: u128, offset: u64, order: RankOrder) -> Ordering {
        let by_mean = match order {
            RankOrder::Descending => mean.cmp(&self.score.mean()),
            _ => self.score.mean().cmp(&mean),
        };
        by_mean.then(self.offset.cmp(&offset))
    }
}

/// Fixed-capacity sorted list of `(score, offset)` pairs
#[derive(Debug, Clone)]
pub struct RankList {
    entries: Vec<RankEntry>,
    capacity: usize,
    order: RankOrder,
}

impl RankList {
    /// Create a list holding up to `capacity` entries.
    pub fn try_new(capacity: usize, order: RankOrder) -> Result<Self, RankError> {
        if capacity == 0 {
            return Err(RankError::ZeroCapacity);
        }
        let mut entries = Vec::new();
        // ranked inserts briefly hold one extra entry before truncating
        entries
            .try_reserve_exact(capacity + 1)
            .map_err(|_| RankError::AllocationFailed(capacity))?;
        Ok(Self {
            entries,
            capacity,
            order,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn order(&self) -> RankOrder {
        self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Mean of the worst admitted entry once the list is full. Ranked lists
    /// admit a candidate only if it beats this value, or ties it with a lower
    /// offset.
    #[inline]
    pub fn threshold(&self) -> Option<u128> {
        match self.order {
            RankOrder::Unranked => None,
            _ if self.is_full() => self.entries.last().map(|e| e.score.mean()),
            _ => None,
        }
    }

    /// Whether a candidate would change the list.
    #[inline]
    pub fn would_admit(&self, mean: u128, offset: u64) -> bool {
        if !self.is_full() {
            return true;
        }
        match (self.order, self.entries.last()) {
            (RankOrder::Unranked, _) | (_, None) => false,
            (order, Some(worst)) => worst.key_cmp(mean, offset, order) == Ordering::Greater,
        }
    }

    /// Offers a candidate. Returns whether it was admitted.
    pub fn insert(&mut self, score: Fru128, offset: u64) -> bool {
        let mean = score.mean();
        if !self.would_admit(mean, offset) {
            return false;
        }
        let entry = RankEntry { score, offset };
        match self.order {
            RankOrder::Unranked => self.entries.push(entry),
            order => {
                let at = self
                    .entries
                    .partition_point(|e| e.key_cmp(mean, offset, order) == Ordering::Less);
                self.entries.insert(at, entry);
                self.entries.truncate(self.capacity);
            }
        }
        true
    }

    pub fn entries(&self) -> &[RankEntry] {
        &self.entries
    }

    pub fn scores(&self) -> impl Iterator<Item = Fru128> + '_ {
        self.entries.iter().map(|e| e.score)
    }

    pub fn offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|e| e.offset)
    }
}
