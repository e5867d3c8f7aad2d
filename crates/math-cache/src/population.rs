//! Frequency-Population Cache
//!
//! Tracks, for every frequency `f`, how many distinct masks currently occur
//! exactly `f` times in a sweep. Logfreedom needs this "frequency of
//! frequencies" histogram and touches at most four of its buckets per step.

use crate::alloc::filled;
use crate::CacheError;

/// Population histogram indexed by frequency
#[derive(Debug, Clone)]
pub struct PopulationCache {
    populations: Vec<u64>,
}

impl PopulationCache {
    /// Create a histogram able to hold frequencies up to `max_frequency`.
    pub fn new(max_frequency: u64) -> Result<Self, CacheError> {
        let len = usize::try_from(max_frequency)
            .ok()
            .and_then(|v| v.checked_add(1))
            .ok_or(CacheError::AllocationFailed {
                what: "population cache",
                len: usize::MAX,
            })?;
        Ok(Self {
            populations: filled(len, 0, "population cache")?,
        })
    }

    /// Largest frequency the histogram can hold
    pub fn max_frequency(&self) -> u64 {
        self.populations.len() as u64 - 1
    }

    /// Resets to an empty sweep over `span` possible masks: every mask has
    /// frequency zero.
    pub fn reset(&mut self, span: u64) {
        self.populations.fill(0);
        self.populations[0] = span;
    }

    /// Builds the histogram from a frequency table.
    pub fn load(&mut self, frequencies: &[u32]) {
        self.populations.fill(0);
        for &f in frequencies {
            self.populations[f as usize] += 1;
        }
    }

    /// Number of distinct masks with frequency `f`
    #[inline]
    pub fn population(&self, frequency: u64) -> u64 {
        self.populations[frequency as usize]
    }

    /// Moves one mask from one frequency bucket to another.
    #[inline]
    pub fn shift(&mut self, from: u64, to: u64) {
        self.populations[from as usize] -= 1;
        self.populations[to as usize] += 1;
    }

    /// Nonzero buckets as `(frequency, population)` pairs
    pub fn nonzero(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.populations
            .iter()
            .enumerate()
            .filter(|(_, &h)| h != 0)
            .map(|(f, &h)| (f as u64, h))
    }
}
