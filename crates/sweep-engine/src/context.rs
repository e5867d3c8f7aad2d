//! Engine context
//!
//! A context owns the two frequency tables and every per-context cache, sized
//! once from its configuration and reused across any number of transforms.
//! Edge 1 always holds the current sweep. Edge 0 holds the needle, or for
//! exo modes the sweep's complement.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use fracterval::Fru128;
use mask_model::{FreqTable, MaskError, MaskMean};
use math_cache::scale::exact_log_scaled;
use math_cache::{CacheStats, LogCache, LogGammaCache, PopulationCache, MAX_BITS, MIN_BITS};
use tracing::{debug, info};

use crate::{Capability, EngineConfig, EngineError, ModeKind, ModeSet, TransformRequest};

/// Needle state held alongside the edge-0 table
#[derive(Debug, Default)]
pub(crate) struct Needle {
    pub loaded: bool,
    /// Masks in the needle
    pub count: u64,
    /// Each needle mask once, in first-seen order
    pub distinct: Vec<u32>,
}

impl Needle {
    pub fn reset(&mut self) {
        self.loaded = false;
        self.count = 0;
        self.distinct.clear();
    }
}

/// Sweep transform context
pub struct Context {
    pub(crate) config: EngineConfig,
    pub(crate) capability: Capability,
    /// Current mask ceiling, below the allocation during an override
    pub(crate) mask_max: u32,
    /// `ln Z` in the accumulator scale
    pub(crate) span_log: Fru128,
    pub(crate) edge0: Option<FreqTable>,
    pub(crate) edge1: FreqTable,
    pub(crate) needle: Needle,
    /// Distinct masks of the first sweep
    pub(crate) distinct: Vec<u32>,
    pub(crate) logs: LogCache,
    pub(crate) log_gamma: Arc<LogGammaCache>,
    pub(crate) population: Option<PopulationCache>,
    pub(crate) mean: Option<MaskMean>,
}

impl Context {
    /// Create a context sharing an existing log-gamma table.
    pub fn new(config: EngineConfig, log_gamma: Arc<LogGammaCache>) -> Result<Self, EngineError> {
        config.validate()?;
        let capability = config.modes.capability();

        let bits = capability
            .log_cache_bits
            .min(config.log_cache_bits.unwrap_or(MAX_BITS))
            .max(MIN_BITS);
        let logs = LogCache::new(bits, capability.log_delta)?;

        let edge1 = FreqTable::try_new(config.mask_max)?;
        let edge0 = if capability.edge0() {
            Some(FreqTable::try_new(config.mask_max)?)
        } else {
            None
        };
        let population = if capability.population {
            Some(PopulationCache::new(config.max_sweep())?)
        } else {
            None
        };

        let span = config.mask_max as u64 + 1;
        let distinct = try_vec(config.max_sweep().min(span), "distinct sweep masks")?;

        let mut overflow = false;
        let span_log = exact_log_scaled(span, &mut overflow);

        info!(
            "Sweep context: granularity {}, mask_max {:#X}, modes {:?}, log cache 2^{} (deltas: {}), edge-0 table: {}",
            config.granularity,
            config.mask_max,
            Vec::from(config.modes),
            bits,
            capability.log_delta,
            edge0.is_some()
        );

        Ok(Self {
            mask_max: config.mask_max,
            config,
            capability,
            span_log,
            edge0,
            edge1,
            needle: Needle::default(),
            distinct,
            logs,
            log_gamma,
            population,
            mean: None,
        })
    }

    /// Create a context with its own log-gamma table.
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let log_gamma = Arc::new(LogGammaCache::new(config.log_gamma_table_len)?);
        Self::new(config, log_gamma)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn modes(&self) -> ModeSet {
        self.config.modes
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Current mask ceiling
    pub fn mask_max(&self) -> u32 {
        self.mask_max
    }

    /// Mask ceiling the tables were allocated for
    pub fn allocated_mask_max(&self) -> u32 {
        self.config.mask_max
    }

    /// Number of possible masks, `mask_max + 1`
    pub fn span(&self) -> u64 {
        self.mask_max as u64 + 1
    }

    /// Shared log-gamma table
    pub fn log_gamma(&self) -> &Arc<LogGammaCache> {
        &self.log_gamma
    }

    /// Needle mask count, if a needle is loaded
    pub fn needle_count(&self) -> Option<u64> {
        self.needle.loaded.then_some(self.needle.count)
    }

    /// Global mean from the last kurtosis or variance transform
    pub fn mean(&self) -> Option<MaskMean> {
        self.mean
    }

    pub fn log_cache_stats(&self) -> CacheStats {
        self.logs.stats()
    }

    /// Loads the reference distribution for divergence modes. Exo transforms
    /// reuse the same table and unload the needle.
    pub fn load_needle(&mut self, masks: &[u32]) -> Result<(), EngineError> {
        if !self.capability.needle {
            return Err(EngineError::NeedleUnused);
        }
        if masks.is_empty() {
            return Err(MaskError::EmptyList.into());
        }
        let len = masks.len() as u64;
        if len > self.config.max_masks() {
            return Err(EngineError::ListTooLong {
                len,
                max: self.config.max_masks(),
            });
        }
        check_masks(masks, self.mask_max)?;

        let want = masks.len().min(self.span() as usize);
        let additional = want.saturating_sub(self.needle.distinct.len());
        self.needle
            .distinct
            .try_reserve(additional)
            .map_err(|_| EngineError::AllocationFailed {
                what: "distinct needle masks",
                len: want,
            })?;
        let Some(table) = self.edge0.as_mut() else {
            return Err(EngineError::NeedleUnused);
        };

        self.needle.reset();
        table.clear();
        for &mask in masks {
            if table.increment(mask) == 1 {
                self.needle.distinct.push(mask);
            }
        }
        self.needle.count = len;
        self.needle.loaded = true;

        debug!(
            "Needle loaded: {} masks, {} distinct",
            len,
            self.needle.distinct.len()
        );
        Ok(())
    }

    /// Runs the following transforms as if `mask_max` were `new_max`, until
    /// the returned guard drops. Densified lists need this since their span
    /// shrinks below the allocation.
    ///
    /// Refused while kurtosis or variance is enabled, since their mean and
    /// sign detection depend on the allocated span.
    pub fn override_mask_max(&mut self, new_max: u32) -> Result<MaskMaxOverride<'_>, EngineError> {
        if self.config.modes.has_moments() {
            return Err(EngineError::OverrideWithMoments);
        }
        if new_max > self.config.mask_max {
            return Err(EngineError::OverrideTooLarge {
                requested: new_max,
                allocated: self.config.mask_max,
            });
        }
        let saved_mask_max = self.mask_max;
        let saved_span_log = self.span_log;
        self.set_mask_max(new_max);
        debug!("mask_max overridden: {:#X} -> {:#X}", saved_mask_max, new_max);
        Ok(MaskMaxOverride {
            context: self,
            saved_mask_max,
            saved_span_log,
        })
    }

    fn set_mask_max(&mut self, mask_max: u32) {
        let mut overflow = false;
        self.mask_max = mask_max;
        self.span_log = exact_log_scaled(mask_max as u64 + 1, &mut overflow);
    }

    /// `W ln Z`, the entropy of `sweep_len` equally likely masks
    pub(crate) fn raw_entropy(&self, sweep_len: u64, overflow: &mut bool) -> Fru128 {
        self.span_log.multiply_u64(sweep_len, overflow)
    }

    /// Validates a request before any state is touched. Returns the sweep
    /// length and sweep count.
    pub(crate) fn check_request(
        &self,
        request: &TransformRequest,
        masks: &[u32],
        expected: ModeKind,
    ) -> Result<(usize, u64), EngineError> {
        let mode = request.mode;
        if mode.kind() != expected {
            return Err(EngineError::ModeKind { mode, expected });
        }
        if !self.config.modes.contains(mode) {
            return Err(EngineError::ModeNotEnabled(mode));
        }

        let len = masks.len() as u64;
        if len > self.config.max_masks() {
            return Err(EngineError::ListTooLong {
                len,
                max: self.config.max_masks(),
            });
        }
        let sweep = request.sweep_len;
        if sweep == 0 {
            return Err(EngineError::SweepEmpty);
        }
        if sweep > self.config.max_sweep() {
            return Err(EngineError::SweepLimit {
                sweep,
                max: self.config.max_sweep(),
            });
        }
        if sweep > len {
            return Err(EngineError::SweepTooLong { sweep, masks: len });
        }
        check_masks(masks, self.mask_max)?;
        Ok((sweep as usize, len - sweep + 1))
    }
}

/// Scoped `mask_max` override. Derefs to the context and restores the
/// previous ceiling when dropped.
pub struct MaskMaxOverride<'a> {
    context: &'a mut Context,
    saved_mask_max: u32,
    saved_span_log: Fru128,
}

impl Deref for MaskMaxOverride<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        self.context
    }
}

impl DerefMut for MaskMaxOverride<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.context
    }
}

impl Drop for MaskMaxOverride<'_> {
    fn drop(&mut self) {
        self.context.mask_max = self.saved_mask_max;
        self.context.span_log = self.saved_span_log;
    }
}

pub(crate) fn check_masks(masks: &[u32], mask_max: u32) -> Result<(), MaskError> {
    match masks.iter().position(|&m| m > mask_max) {
        Some(index) => Err(MaskError::MaskOutOfRange {
            mask: masks[index],
            index,
            mask_max,
        }),
        None => Ok(()),
    }
}

fn try_vec(capacity: u64, what: &'static str) -> Result<Vec<u32>, EngineError> {
    let len = usize::try_from(capacity).map_err(|_| EngineError::AllocationFailed {
        what,
        len: usize::MAX,
    })?;
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| EngineError::AllocationFailed { what, len })?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mode;

    fn context(modes: ModeSet) -> Context {
        Context::from_config(EngineConfig::bytes(modes)).unwrap()
    }

    #[test]
    fn test_context_sizes_from_capability() {
        let ctx = context(ModeSet::single(Mode::Agnentropy));
        assert!(ctx.edge0.is_none());
        assert!(ctx.population.is_none());
        assert!(!ctx.logs.has_delta());
        assert_eq!(ctx.logs.bits(), 12);

        let ctx = context(ModeSet::single(Mode::Logfreedom).with(Mode::Exoentropy));
        assert!(ctx.edge0.is_some());
        assert!(ctx.population.is_some());
        assert!(ctx.logs.has_delta());
        assert_eq!(ctx.logs.bits(), 20);
    }

    #[test]
    fn test_log_cache_bits_cap() {
        let config = EngineConfig {
            log_cache_bits: Some(10),
            ..EngineConfig::bytes(ModeSet::single(Mode::Jsd))
        };
        let ctx = Context::from_config(config).unwrap();
        assert_eq!(ctx.logs.bits(), 10);
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        assert_eq!(
            Context::from_config(EngineConfig::bytes(ModeSet::EMPTY)).err(),
            Some(EngineError::EmptyModeSet)
        );
    }

    #[test]
    fn test_load_needle() {
        let mut ctx = context(ModeSet::single(Mode::Diventropy));
        assert_eq!(ctx.needle_count(), None);
        ctx.load_needle(&[1, 2, 2, 3]).unwrap();
        assert_eq!(ctx.needle_count(), Some(4));
        assert_eq!(ctx.needle.distinct, vec![1, 2, 3]);

        // reloading replaces the previous needle
        ctx.load_needle(&[9]).unwrap();
        assert_eq!(ctx.needle_count(), Some(1));
        let table = ctx.edge0.as_ref().unwrap();
        assert_eq!(table.count(2), 0);
        assert_eq!(table.count(9), 1);
    }

    #[test]
    fn test_load_needle_errors() {
        let mut ctx = context(ModeSet::single(Mode::Shannon));
        assert_eq!(ctx.load_needle(&[1]), Err(EngineError::NeedleUnused));

        let mut ctx = context(ModeSet::single(Mode::Ld));
        assert_eq!(
            ctx.load_needle(&[]),
            Err(EngineError::Mask(MaskError::EmptyList))
        );

        let mut guard = ctx.override_mask_max(15).unwrap();
        assert!(matches!(
            guard.load_needle(&[3, 16]),
            Err(EngineError::Mask(MaskError::MaskOutOfRange { index: 1, .. }))
        ));
    }

    #[test]
    fn test_override_restores_on_drop() {
        let mut ctx = context(ModeSet::single(Mode::Shannon));
        let before = ctx.span_log;
        {
            let guard = ctx.override_mask_max(15).unwrap();
            assert_eq!(guard.mask_max(), 15);
            assert_eq!(guard.span(), 16);
            assert_ne!(guard.span_log, before);
        }
        assert_eq!(ctx.mask_max(), 255);
        assert_eq!(ctx.span_log, before);
    }

    #[test]
    fn test_override_refusals() {
        let mut ctx = context(ModeSet::single(Mode::Variance));
        assert_eq!(
            ctx.override_mask_max(15).err(),
            Some(EngineError::OverrideWithMoments)
        );

        let mut ctx = context(ModeSet::single(Mode::Shannon));
        assert_eq!(
            ctx.override_mask_max(256).err(),
            Some(EngineError::OverrideTooLarge {
                requested: 256,
                allocated: 255
            })
        );
    }

    #[test]
    fn test_check_request() {
        let ctx = context(ModeSet::single(Mode::Shannon));
        let masks = [1, 2, 3, 4];

        let ok = TransformRequest::new(Mode::Shannon, 3);
        assert_eq!(ctx.check_request(&ok, &masks, ModeKind::Entropy), Ok((3, 2)));

        let wrong_kind = TransformRequest::new(Mode::Jsd, 3);
        assert_eq!(
            ctx.check_request(&wrong_kind, &masks, ModeKind::Entropy),
            Err(EngineError::ModeKind {
                mode: Mode::Jsd,
                expected: ModeKind::Entropy
            })
        );

        let disabled = TransformRequest::new(Mode::Agnentropy, 3);
        assert_eq!(
            ctx.check_request(&disabled, &masks, ModeKind::Entropy),
            Err(EngineError::ModeNotEnabled(Mode::Agnentropy))
        );

        let empty = TransformRequest::new(Mode::Shannon, 0);
        assert_eq!(
            ctx.check_request(&empty, &masks, ModeKind::Entropy),
            Err(EngineError::SweepEmpty)
        );

        let long = TransformRequest::new(Mode::Shannon, 5);
        assert_eq!(
            ctx.check_request(&long, &masks, ModeKind::Entropy),
            Err(EngineError::SweepTooLong { sweep: 5, masks: 4 })
        );
    }
}
