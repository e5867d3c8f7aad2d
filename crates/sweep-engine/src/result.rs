//! Transform requests and results

use fracterval::Fru128;
use math_cache::scale::scaled_to_f64;
use rank_list::{RankList, RankOrder};
use serde::{Deserialize, Serialize};

use crate::Mode;

/// Parameters of one transform call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub mode: Mode,
    /// Masks per sweep
    pub sweep_len: u64,
    /// Number of best sweeps to keep. Ignored when unranked.
    pub rank_count: usize,
    pub order: RankOrder,
    /// Report the sweep offset of every returned score
    pub want_offsets: bool,
}

impl TransformRequest {
    /// The single lowest-scoring sweep, with its offset
    pub fn new(mode: Mode, sweep_len: u64) -> Self {
        Self {
            mode,
            sweep_len,
            rank_count: 1,
            order: RankOrder::Ascending,
            want_offsets: true,
        }
    }

    /// Keep the best `rank_count` sweeps in `order`
    pub fn ranked(mut self, rank_count: usize, order: RankOrder) -> Self {
        self.rank_count = rank_count;
        self.order = order;
        self
    }

    /// Every sweep's score in offset order
    pub fn unranked(mut self) -> Self {
        self.order = RankOrder::Unranked;
        self
    }

    pub fn without_offsets(mut self) -> Self {
        self.want_offsets = false;
        self
    }

    /// Rank list capacity for a transform over `sweep_count` sweeps
    pub(crate) fn capacity(&self, sweep_count: u64) -> usize {
        let sweep_count = usize::try_from(sweep_count).unwrap_or(usize::MAX);
        match self.order {
            RankOrder::Unranked => sweep_count,
            _ => self.rank_count.min(sweep_count),
        }
    }
}

/// Scores from one transform call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformResult {
    pub mode: Mode,
    /// Number of sweep offsets evaluated
    pub sweep_count: u64,
    /// Ranked (or, unranked, offset-ordered) scores
    pub scores: Vec<Fru128>,
    /// Sweep offset of each score, when requested
    pub offsets: Option<Vec<u64>>,
    /// Whether any interval operation saturated. Scores remain sound bounds.
    pub overflow: bool,
}

impl TransformResult {
    pub(crate) fn from_ranks(
        mode: Mode,
        sweep_count: u64,
        ranks: &RankList,
        want_offsets: bool,
        overflow: bool,
    ) -> Self {
        Self {
            mode,
            sweep_count,
            scores: ranks.scores().collect(),
            offsets: want_offsets.then(|| ranks.offsets().collect()),
            overflow,
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Score `i` as a float: a fraction for unit modes, nats otherwise
    /// (kurtosis as a plain ratio).
    pub fn value_f64(&self, i: usize) -> Option<f64> {
        let score = *self.scores.get(i)?;
        Some(if self.mode.is_unit() {
            score.to_f64()
        } else {
            scaled_to_f64(score)
        })
    }

    /// Every score as a float
    pub fn values_f64(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|i| self.value_f64(i)).collect()
    }

    /// Offset of score `i`, when offsets were requested
    pub fn offset(&self, i: usize) -> Option<u64> {
        self.offsets.as_ref()?.get(i).copied()
    }
}
