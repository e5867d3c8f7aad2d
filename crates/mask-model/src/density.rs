//! Densify
//!
//! Drops mask values absent from both needle and haystack, renumbering the
//! survivors in order. The smaller span shrinks tables and caches and keeps
//! unused symbols from diluting span-normalised metrics.

use crate::MaskError;

/// One bit per possible mask value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedBitmap {
    words: Vec<u64>,
    mask_max: u32,
}

impl UsedBitmap {
    pub fn try_new(mask_max: u32) -> Result<Self, MaskError> {
        let len = (mask_max as usize >> 6) + 1;
        let mut words = Vec::new();
        words
            .try_reserve_exact(len)
            .map_err(|_| MaskError::AllocationFailed {
                what: "used-mask bitmap",
                len,
            })?;
        words.resize(len, 0);
        Ok(Self { words, mask_max })
    }

    pub fn mask_max(&self) -> u32 {
        self.mask_max
    }

    /// Marks every mask in `masks` as used. Call once per list to build the
    /// joint needle and haystack bitmap.
    pub fn mark(&mut self, masks: &[u32]) -> Result<(), MaskError> {
        if let Some(index) = masks.iter().position(|&m| m > self.mask_max) {
            return Err(MaskError::MaskOutOfRange {
                mask: masks[index],
                index,
                mask_max: self.mask_max,
            });
        }
        for &m in masks {
            self.words[m as usize >> 6] |= 1 << (m & 63);
        }
        Ok(())
    }

    #[inline]
    pub fn is_used(&self, mask: u32) -> bool {
        self.words[mask as usize >> 6] & (1 << (mask & 63)) != 0
    }

    pub fn count_used(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }
}

/// Forward and inverse remapping built from a `UsedBitmap`
#[derive(Debug, Clone)]
pub struct DensityMap {
    used: UsedBitmap,
    /// Used masks below each word
    ranks: Vec<u32>,
    /// Dense index to original mask
    inverse: Vec<u32>,
}

impl DensityMap {
    pub fn build(used: &UsedBitmap) -> Result<Self, MaskError> {
        let count = used.count_used() as usize;
        if count == 0 {
            return Err(MaskError::EmptyList);
        }

        let mut ranks = Vec::new();
        ranks
            .try_reserve_exact(used.words.len())
            .map_err(|_| MaskError::AllocationFailed {
                what: "density ranks",
                len: used.words.len(),
            })?;
        let mut inverse = Vec::new();
        inverse
            .try_reserve_exact(count)
            .map_err(|_| MaskError::AllocationFailed {
                what: "density inverse",
                len: count,
            })?;

        let mut below = 0u32;
        for (i, &word) in used.words.iter().enumerate() {
            ranks.push(below);
            below += word.count_ones();
            let mut bits = word;
            while bits != 0 {
                let bit = bits.trailing_zeros();
                inverse.push(((i as u32) << 6) | bit);
                bits &= bits - 1;
            }
        }

        Ok(Self {
            used: used.clone(),
            ranks,
            inverse,
        })
    }

    /// Ceiling of the dense mask space
    pub fn mask_max(&self) -> u32 {
        (self.inverse.len() - 1) as u32
    }

    /// Dense index of a used mask
    #[inline]
    pub fn forward(&self, mask: u32) -> u32 {
        let word = self.used.words[mask as usize >> 6];
        let below = word & ((1u64 << (mask & 63)) - 1);
        self.ranks[mask as usize >> 6] + below.count_ones()
    }

    /// Original mask of a dense index
    #[inline]
    pub fn inverse(&self, dense: u32) -> u32 {
        self.inverse[dense as usize]
    }

    /// Renumbers masks in place. Every mask must be marked in the bitmap.
    pub fn densify(&self, masks: &mut [u32]) -> Result<(), MaskError> {
        if let Some(index) = masks
            .iter()
            .position(|&m| m > self.used.mask_max || !self.used.is_used(m))
        {
            return Err(MaskError::MaskOutOfRange {
                mask: masks[index],
                index,
                mask_max: self.used.mask_max,
            });
        }
        for m in masks.iter_mut() {
            *m = self.forward(*m);
        }
        Ok(())
    }

    /// Restores the original masks.
    pub fn undensify(&self, masks: &mut [u32]) -> Result<(), MaskError> {
        let mask_max = self.mask_max();
        if let Some(index) = masks.iter().position(|&m| m > mask_max) {
            return Err(MaskError::MaskOutOfRange {
                mask: masks[index],
                index,
                mask_max,
            });
        }
        for m in masks.iter_mut() {
            *m = self.inverse(*m);
        }
        Ok(())
    }
}
