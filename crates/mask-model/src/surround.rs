//! Surroundify
//!
//! Codes each mask by its distance from the previous one, enumerating the
//! joint range outward: previous, +1, -1, +2, -2 and so on, continuing on the
//! longer side once the shorter one runs out. Codes cover exactly
//! `0..=max-min`, so the transform is a bijection and inverts exactly.

use serde::{Deserialize, Serialize};

use crate::MaskError;

/// Joint minimum and maximum over every list being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurroundRange {
    pub min: u32,
    pub max: u32,
}

impl SurroundRange {
    /// Range covering every mask in every list, or `None` if all are empty.
    pub fn joint(lists: &[&[u32]]) -> Option<Self> {
        let mut masks = lists.iter().flat_map(|l| l.iter().copied());
        let first = masks.next()?;
        let (min, max) = masks.fold((first, first), |(lo, hi), m| (lo.min(m), hi.max(m)));
        Some(Self { min, max })
    }

    /// Ceiling of the coded mask space
    pub fn mask_max(&self) -> u32 {
        self.max - self.min
    }

    #[inline]
    fn encode(&self, previous: u32, mask: u32) -> u32 {
        let below = previous - self.min;
        let above = self.max - previous;
        let near = below.min(above);
        if mask == previous {
            0
        } else if mask > previous {
            let d = mask - previous;
            if d <= near {
                2 * d - 1
            } else {
                near + d
            }
        } else {
            let d = previous - mask;
            if d <= near {
                2 * d
            } else {
                near + d
            }
        }
    }

    #[inline]
    fn decode(&self, previous: u32, code: u32) -> u32 {
        let below = previous - self.min;
        let above = self.max - previous;
        let near = below.min(above);
        if code == 0 {
            previous
        } else if code <= 2 * near {
            if code & 1 == 1 {
                previous + (code + 1) / 2
            } else {
                previous - code / 2
            }
        } else if above > below {
            previous + (code - near)
        } else {
            previous - (code - near)
        }
    }

    fn check(&self, masks: &[u32]) -> Result<(), MaskError> {
        match masks.iter().position(|&m| m < self.min || m > self.max) {
            Some(index) => Err(MaskError::MaskOutOfRange {
                mask: masks[index],
                index,
                mask_max: self.max,
            }),
            None => Ok(()),
        }
    }
}

/// Replaces masks with surround codes. The first mask is coded relative to
/// the range minimum.
pub fn surroundify(masks: &mut [u32], range: SurroundRange) -> Result<(), MaskError> {
    range.check(masks)?;
    for i in (1..masks.len()).rev() {
        masks[i] = range.encode(masks[i - 1], masks[i]);
    }
    if let Some(first) = masks.first_mut() {
        *first = range.encode(range.min, *first);
    }
    Ok(())
}

/// Restores masks from surround codes built with the same range.
pub fn unsurroundify(masks: &mut [u32], range: SurroundRange) -> Result<(), MaskError> {
    let mask_max = range.mask_max();
    if let Some(index) = masks.iter().position(|&m| m > mask_max) {
        return Err(MaskError::MaskOutOfRange {
            mask: masks[index],
            index,
            mask_max,
        });
    }
    let mut previous = range.min;
    for m in masks.iter_mut() {
        *m = range.decode(previous, *m);
        previous = *m;
    }
    Ok(())
}
