//! Frequency Tables
//!
//! Occurrence counts indexed by mask value, plus the running total. The
//! total always equals the number of masks accrued minus those unaccrued.

use crate::MaskError;

/// Mask value to occurrence count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreqTable {
    counts: Vec<u32>,
    total: u64,
}

impl FreqTable {
    /// Create a zeroed table covering masks `0..=mask_max`.
    pub fn try_new(mask_max: u32) -> Result<Self, MaskError> {
        let len = mask_max as usize + 1;
        let mut counts = Vec::new();
        counts
            .try_reserve_exact(len)
            .map_err(|_| MaskError::AllocationFailed {
                what: "frequency table",
                len,
            })?;
        counts.resize(len, 0);
        Ok(Self { counts, total: 0 })
    }

    /// Largest mask the table can count
    pub fn mask_max(&self) -> u32 {
        (self.counts.len() - 1) as u32
    }

    /// Number of masks currently counted
    pub fn total(&self) -> u64 {
        self.total
    }

    #[inline]
    pub fn count(&self, mask: u32) -> u32 {
        self.counts[mask as usize]
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Number of masks with a nonzero count
    pub fn distinct(&self) -> u64 {
        self.counts.iter().filter(|&&c| c != 0).count() as u64
    }

    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.total = 0;
    }

    /// Counts every mask in `masks`.
    pub fn accrue(&mut self, masks: &[u32]) {
        for &m in masks {
            self.counts[m as usize] += 1;
        }
        self.total += masks.len() as u64;
    }

    /// Exact inverse of `accrue` for the same masks.
    pub fn unaccrue(&mut self, masks: &[u32]) {
        for &m in masks {
            self.counts[m as usize] -= 1;
        }
        self.total -= masks.len() as u64;
    }

    /// Counts one mask and returns its new count.
    #[inline]
    pub fn increment(&mut self, mask: u32) -> u32 {
        let count = &mut self.counts[mask as usize];
        *count += 1;
        self.total += 1;
        *count
    }

    /// Uncounts one mask and returns its new count.
    #[inline]
    pub fn decrement(&mut self, mask: u32) -> u32 {
        let count = &mut self.counts[mask as usize];
        *count -= 1;
        self.total -= 1;
        *count
    }

    /// Adjusts the counts for one mask leaving and one entering.
    #[inline]
    pub fn exchange(&mut self, exiting: u32, entering: u32) {
        self.counts[exiting as usize] -= 1;
        self.counts[entering as usize] += 1;
    }

    /// Subtracts another table entry by entry. Nothing changes on error.
    pub fn subtract_table(&mut self, other: &FreqTable) -> Result<(), MaskError> {
        if let Some(mask) = self
            .counts
            .iter()
            .zip(other.counts.iter())
            .position(|(&a, &b)| b > a)
        {
            return Err(MaskError::TableUnderflow { mask: mask as u32 });
        }
        if other.counts.len() > self.counts.len()
            && other.counts[self.counts.len()..].iter().any(|&c| c != 0)
        {
            return Err(MaskError::TableUnderflow {
                mask: self.counts.len() as u32,
            });
        }
        for (a, &b) in self.counts.iter_mut().zip(other.counts.iter()) {
            *a -= b;
        }
        self.total -= other.total;
        Ok(())
    }
}
