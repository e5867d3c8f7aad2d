//! Deltafy
//!
//! Replaces each mask with its wrap-around difference from the previous one.
//! Smooth signals collapse onto a few small deltas, which sharpens every
//! entropy metric. The first mask is kept as is, so the transform inverts
//! exactly.

use serde::{Deserialize, Serialize};

use crate::list::full_mask_max;
use crate::MaskError;

/// Largest number of stacked delta passes
pub const MAX_DELTA_COUNT: u8 = 3;

/// Whether to apply or undo a transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Apply,
    Undo,
}

/// One delta pass over `masks`.
///
/// Without `channelize` deltas wrap modulo `mask_max + 1`. With it each byte
/// lane wraps modulo 256 independently, which suits interleaved multi-channel
/// samples; that mode requires the full-width `mask_max`.
pub fn deltafy(
    masks: &mut [u32],
    granularity: u8,
    mask_max: u32,
    channelize: bool,
    direction: Direction,
) -> Result<(), MaskError> {
    let full = full_mask_max(granularity)?;
    if mask_max > full {
        return Err(MaskError::MaskMaxTooLarge {
            mask_max,
            limit: full,
            granularity,
        });
    }
    if channelize && mask_max != full {
        return Err(MaskError::ChannelizeNeedsFullWidth {
            mask_max,
            expected: full,
        });
    }
    if masks.len() < 2 {
        return Ok(());
    }

    let lanes = granularity as usize + 1;
    let span = mask_max as u64 + 1;
    let diff = |a: u32, b: u32| -> u32 {
        if channelize {
            lane_op(a, b, lanes, u8::wrapping_sub)
        } else {
            ((a as u64 + span - b as u64) % span) as u32
        }
    };
    let sum = |a: u32, b: u32| -> u32 {
        if channelize {
            lane_op(a, b, lanes, u8::wrapping_add)
        } else {
            ((a as u64 + b as u64) % span) as u32
        }
    };

    match direction {
        // back to front, so each predecessor is still original
        Direction::Apply => {
            for i in (1..masks.len()).rev() {
                masks[i] = diff(masks[i], masks[i - 1]);
            }
        }
        // front to back, so each predecessor is already restored
        Direction::Undo => {
            for i in 1..masks.len() {
                masks[i] = sum(masks[i], masks[i - 1]);
            }
        }
    }
    Ok(())
}

/// `count` stacked delta passes, 0 to 3.
pub fn deltafy_n(
    masks: &mut [u32],
    count: u8,
    granularity: u8,
    mask_max: u32,
    channelize: bool,
    direction: Direction,
) -> Result<(), MaskError> {
    if count > MAX_DELTA_COUNT {
        return Err(MaskError::DeltaCount(count));
    }
    for _ in 0..count {
        deltafy(masks, granularity, mask_max, channelize, direction)?;
    }
    Ok(())
}

#[inline]
fn lane_op(a: u32, b: u32, lanes: usize, op: fn(u8, u8) -> u8) -> u32 {
    let (a, b) = (a.to_le_bytes(), b.to_le_bytes());
    let mut out = [0u8; 4];
    for lane in 0..lanes {
        out[lane] = op(a[lane], b[lane]);
    }
    u32::from_le_bytes(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_bytes() {
        let mut masks = vec![10, 12, 11, 11];
        deltafy(&mut masks, 0, 255, false, Direction::Apply).unwrap();
        assert_eq!(masks, vec![10, 2, 255, 0]);
        deltafy(&mut masks, 0, 255, false, Direction::Undo).unwrap();
        assert_eq!(masks, vec![10, 12, 11, 11]);
    }

    #[test]
    fn test_delta_wraps_modulo_span() {
        let mut masks = vec![5, 0];
        deltafy(&mut masks, 0, 9, false, Direction::Apply).unwrap();
        assert_eq!(masks, vec![5, 5]);
    }

    #[test]
    fn test_channelized_lanes_wrap_independently() {
        let mut masks = vec![0x0100, 0x00FF];
        deltafy(&mut masks, 1, 0xFFFF, true, Direction::Apply).unwrap();
        // low lane 0xFF - 0x00, high lane 0x00 - 0x01
        assert_eq!(masks, vec![0x0100, 0xFFFF]);

        let mut plain = vec![0x0100, 0x00FF];
        deltafy(&mut plain, 1, 0xFFFF, false, Direction::Apply).unwrap();
        assert_eq!(plain, vec![0x0100, 0xFFFF]);
    }

    #[test]
    fn test_channelize_needs_full_width() {
        let mut masks = vec![1, 2];
        assert_eq!(
            deltafy(&mut masks, 1, 0x0FFF, true, Direction::Apply),
            Err(MaskError::ChannelizeNeedsFullWidth {
                mask_max: 0x0FFF,
                expected: 0xFFFF
            })
        );
    }

    #[test]
    fn test_deltafy_n_round_trip() {
        let original = vec![3, 1, 4, 1, 5, 9, 2, 6];
        let mut masks = original.clone();
        deltafy_n(&mut masks, 3, 0, 255, false, Direction::Apply).unwrap();
        assert_ne!(masks, original);
        deltafy_n(&mut masks, 3, 0, 255, false, Direction::Undo).unwrap();
        assert_eq!(masks, original);
        assert_eq!(
            deltafy_n(&mut masks, 4, 0, 255, false, Direction::Apply),
            Err(MaskError::DeltaCount(4))
        );
    }
}
