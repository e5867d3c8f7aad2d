//! Single-distribution transforms
//!
//! Running sums per metric, with `f` the sweep frequency of a mask:
//! - agnentropy and logfreedom: `L = Σ ln Γ(f+1)`; logfreedom adds
//!   `P = Σ ln Γ(H+1)` over the frequency populations `H`
//! - Shannon: `S = Σ f ln f`
//! - variance and kurtosis: sums of squared and quartic deviations from the
//!   global mean, scaled up by the widest deviation in the list and
//!   pre-shifted so a whole sweep fits in one fraction
//!
//! Every running sum adds before it subtracts, so the intervals never
//! underflow while the true value stays non-negative.

use fracterval::{Fru128, Reciprocal};
use mask_model::{mean_get, FreqTable, MaskMean};
use math_cache::{LogGammaCache, PopulationCache};
use rank_list::RankList;
use tracing::{debug, warn};

use crate::context::Context;
use crate::logs::ScaledLogs;
use crate::sweep::{self, SweepKernel};
use crate::{EngineError, Mode, ModeKind, Normalizer, TransformRequest, TransformResult};

/// Obtuse variance and kurtosis against a fixed global mean
struct Moments {
    mean: MaskMean,
    /// `1 / (N Z)`, turning `|N x - Σx|` into a deviation in [0, 1)
    unit: Fru128,
    /// Left shift taking the widest deviation of the list into [1/4, 1)
    dshift: u32,
    /// Right shift applied to every per-mask term
    vshift: u32,
    /// `W / 2^vshift`
    ratio: Fru128,
    ratio_recip: Reciprocal,
    sum2: Fru128,
    sum4: Fru128,
    /// Sweep masks with a nonzero deviation
    nonzero: u64,
    kurtosis: bool,
}

impl Moments {
    fn new(mean: MaskMean, sweep_len: u64, kurtosis: bool, overflow: &mut bool) -> Self {
        let span = mean.mask_max as u128 + 1;
        let whole = mean.count as u128 * span;
        let unit = Fru128::from_ratio(1, whole, overflow);
        // spread << dshift keeps one bit fewer than N Z
        let dshift = mean
            .spread
            .leading_zeros()
            .saturating_sub(whole.leading_zeros() + 1);
        // 2^vshift > W, so W shifted terms stay below one
        let vshift = u64::BITS - sweep_len.leading_zeros();
        let ratio = Fru128::from_ratio(sweep_len as u128, 1u128 << vshift, overflow);
        Self {
            mean,
            unit,
            dshift,
            vshift,
            ratio,
            ratio_recip: Reciprocal::new(ratio, overflow),
            sum2: Fru128::ZERO,
            sum4: Fru128::ZERO,
            nonzero: 0,
            kurtosis,
        }
    }

    /// Shifted `d^2` and `d^4` of one mask, or `None` if it sits on the mean
    #[inline]
    fn deviation(&self, mask: u32, overflow: &mut bool) -> Option<(Fru128, Fru128)> {
        let distance = self.mean.distance(mask);
        if distance == 0 {
            return None;
        }
        // at most the spread, so still below N Z <= 2^64 once shifted
        let d = self.unit.multiply_u64((distance << self.dshift) as u64, overflow);
        let d2 = d.multiply(d);
        let d4 = d2.multiply(d2);
        Some((d2.shift_right(self.vshift), d4.shift_right(self.vshift)))
    }

    fn accrue(&mut self, mask: u32, count: u64, overflow: &mut bool) {
        if let Some((d2, d4)) = self.deviation(mask, overflow) {
            self.sum2 = self.sum2.add(d2.multiply_u64(count, overflow), overflow);
            self.sum4 = self.sum4.add(d4.multiply_u64(count, overflow), overflow);
            self.nonzero += count;
        }
    }

    fn step(&mut self, exiting: u32, entering: u32, overflow: &mut bool) {
        if let Some((d2, d4)) = self.deviation(entering, overflow) {
            self.sum2 = self.sum2.add(d2, overflow);
            self.sum4 = self.sum4.add(d4, overflow);
            self.nonzero += 1;
        }
        if let Some((d2, d4)) = self.deviation(exiting, overflow) {
            self.sum2 = self.sum2.subtract_clamped(d2, overflow);
            self.sum4 = self.sum4.subtract_clamped(d4, overflow);
            self.nonzero -= 1;
        }
    }

    fn score(&self, overflow: &mut bool) -> Fru128 {
        if self.nonzero == 0 {
            return Fru128::ZERO;
        }
        // both ratios below are truly at most one, so clipping them is sound
        let mut clipped = false;
        if !self.kurtosis {
            // undo the deviation scaling; kurtosis is free of it
            return self
                .ratio_recip
                .apply(self.sum2, &mut clipped)
                .shift_right(2 * self.dshift);
        }
        if self.sum2.lower() == 0 {
            *overflow = true;
            return Fru128::new(0, u128::MAX);
        }
        // W Σd^4 / (Σd^2)^2, as (S4/S2) (W/2^v) / S2 in 64.64
        let recip = Reciprocal::new(self.sum2, overflow);
        let quotient = recip.apply(self.sum4, &mut clipped).multiply(self.ratio);
        recip.apply_scaled(quotient, 64, overflow)
    }
}

enum Metric<'a> {
    Agnentropy {
        constant: Fru128,
        log_sum: Fru128,
    },
    Logfreedom {
        constant: Fru128,
        log_sum: Fru128,
        pop_sum: Fru128,
        population: &'a mut PopulationCache,
    },
    Shannon {
        w_ln_w: Fru128,
        sum: Fru128,
    },
    Moments(Moments),
}

/// Running state of one single-distribution transform
pub(crate) struct EntropyKernel<'a> {
    sweep: &'a mut FreqTable,
    logs: ScaledLogs<'a>,
    metric: Metric<'a>,
    normalizer: Option<Normalizer>,
}

impl<'a> EntropyKernel<'a> {
    /// Builds the kernel over the first sweep, already accrued into `sweep`.
    #[allow(clippy::too_many_arguments)]
    fn new(
        mode: Mode,
        sweep: &'a mut FreqTable,
        distinct: &[u32],
        mut logs: ScaledLogs<'a>,
        log_gamma: &LogGammaCache,
        population: Option<&'a mut PopulationCache>,
        mean: Option<MaskMean>,
        sweep_len: u64,
        span: u64,
        normalizer: Option<Normalizer>,
        overflow: &mut bool,
    ) -> Result<Self, EngineError> {
        let metric = match mode {
            Mode::Agnentropy | Mode::Compressivity => {
                let constant = log_gamma
                    .log_gamma(sweep_len + span, overflow)
                    .subtract_clamped(log_gamma.log_gamma(span, overflow), overflow);
                let mut log_sum = Fru128::ZERO;
                for &m in distinct {
                    let f = sweep.count(m) as u64;
                    log_sum = log_sum.add(log_gamma.log_gamma(f + 1, overflow), overflow);
                }
                Metric::Agnentropy { constant, log_sum }
            }
            Mode::Logfreedom | Mode::Dyspoissonism => {
                let population = population.ok_or(EngineError::ModeNotEnabled(mode))?;
                population.reset(span);
                let mut log_sum = Fru128::ZERO;
                for &m in distinct {
                    let f = sweep.count(m) as u64;
                    population.shift(0, f);
                    log_sum = log_sum.add(log_gamma.log_gamma(f + 1, overflow), overflow);
                }
                let mut pop_sum = Fru128::ZERO;
                for (_, h) in population.nonzero() {
                    pop_sum = pop_sum.add(log_gamma.log_gamma(h + 1, overflow), overflow);
                }
                let constant = log_gamma
                    .log_gamma(sweep_len + 1, overflow)
                    .add(log_gamma.log_gamma(span + 1, overflow), overflow);
                Metric::Logfreedom {
                    constant,
                    log_sum,
                    pop_sum,
                    population,
                }
            }
            Mode::Shannon | Mode::Shannonism => {
                let w_ln_w = logs.n_ln_n(sweep_len, overflow);
                let mut sum = Fru128::ZERO;
                for &m in distinct {
                    let f = sweep.count(m) as u64;
                    sum = sum.add(logs.n_ln_n(f, overflow), overflow);
                }
                Metric::Shannon { w_ln_w, sum }
            }
            Mode::Kurtosis | Mode::Variance => {
                let mean = mean.ok_or(EngineError::ModeNotEnabled(mode))?;
                let mut moments = Moments::new(mean, sweep_len, mode == Mode::Kurtosis, overflow);
                for &m in distinct {
                    moments.accrue(m, sweep.count(m) as u64, overflow);
                }
                Metric::Moments(moments)
            }
            _ => {
                return Err(EngineError::ModeKind {
                    mode,
                    expected: ModeKind::Entropy,
                })
            }
        };

        Ok(Self {
            sweep,
            logs,
            metric,
            normalizer,
        })
    }
}

impl SweepKernel for EntropyKernel<'_> {
    fn step(&mut self, exiting: u32, entering: u32, overflow: &mut bool) {
        let logs = &mut self.logs;
        match &mut self.metric {
            Metric::Moments(moments) => {
                self.sweep.exchange(exiting, entering);
                moments.step(exiting, entering, overflow);
            }
            Metric::Agnentropy { log_sum, .. } => {
                // ln Γ(x) - ln Γ(x+1) = -ln x
                let before = self.sweep.decrement(exiting) as u64 + 1;
                let after = self.sweep.increment(entering) as u64;
                *log_sum = log_sum
                    .add(logs.ln(after, overflow), overflow)
                    .subtract_clamped(logs.ln(before, overflow), overflow);
            }
            Metric::Shannon { sum, .. } => {
                let before = self.sweep.decrement(exiting) as u64 + 1;
                let after = self.sweep.increment(entering) as u64;
                *sum = sum
                    .add(logs.gd(after, overflow), overflow)
                    .subtract_clamped(logs.gd(before, overflow), overflow);
            }
            Metric::Logfreedom {
                log_sum,
                pop_sum,
                population,
                ..
            } => {
                let x = self.sweep.decrement(exiting) as u64 + 1;
                let y = self.sweep.increment(entering) as u64 - 1;
                *log_sum = log_sum
                    .add(logs.ln(y + 1, overflow), overflow)
                    .subtract_clamped(logs.ln(x, overflow), overflow);

                // one mask moves from bucket x to x-1, another from y to y+1
                for (from, to) in [(x, x - 1), (y, y + 1)] {
                    let grown = population.population(to) + 1;
                    let shrunk = population.population(from);
                    *pop_sum = pop_sum
                        .add(logs.ln(grown, overflow), overflow)
                        .subtract_clamped(logs.ln(shrunk, overflow), overflow);
                    population.shift(from, to);
                }
            }
        }
    }

    fn score(&mut self, overflow: &mut bool) -> Fru128 {
        let entropy = match &self.metric {
            Metric::Agnentropy { constant, log_sum } => constant.subtract_clamped(*log_sum, overflow),
            Metric::Logfreedom {
                constant,
                log_sum,
                pop_sum,
                ..
            } => constant.subtract_clamped(log_sum.add(*pop_sum, overflow), overflow),
            Metric::Shannon { w_ln_w, sum } => w_ln_w.subtract_clamped(*sum, overflow),
            Metric::Moments(moments) => return moments.score(overflow),
        };
        match &self.normalizer {
            Some(normalizer) => normalizer.compressivity(entropy, overflow),
            None => entropy,
        }
    }
}

impl Context {
    /// Scores every sweep of `masks` with a single-distribution mode.
    ///
    /// Fails before touching any state if the request is invalid. Numerical
    /// overflow is not an error; it is reported in the result.
    pub fn transform(
        &mut self,
        request: &TransformRequest,
        masks: &[u32],
    ) -> Result<TransformResult, EngineError> {
        let (sweep_len, sweep_count) = self.check_request(request, masks, ModeKind::Entropy)?;
        let mode = request.mode;
        let mut ranks = RankList::try_new(request.capacity(sweep_count), request.order)?;
        if mode.capability().mean {
            self.mean = Some(mean_get(masks, self.mask_max)?);
        }

        let mut overflow = false;
        let normalizer = match mode {
            Mode::Compressivity | Mode::Dyspoissonism | Mode::Shannonism => Some(Normalizer::new(
                self.raw_entropy(request.sweep_len, &mut overflow),
                &mut overflow,
            )),
            _ => None,
        };
        let span = self.span();
        let mean = self.mean;

        let Context {
            edge1,
            distinct,
            logs,
            log_gamma,
            population,
            ..
        } = &mut *self;
        let population = population.as_mut();
        if mode.capability().population && population.is_none() {
            return Err(EngineError::ModeNotEnabled(mode));
        }

        sweep::begin(edge1, distinct, &masks[..sweep_len]);
        let mut kernel = EntropyKernel::new(
            mode,
            edge1,
            distinct,
            ScaledLogs::new(logs),
            log_gamma.as_ref(),
            population,
            mean,
            request.sweep_len,
            span,
            normalizer,
            &mut overflow,
        )?;
        sweep::run(&mut kernel, masks, sweep_len, &mut ranks, &mut overflow);
        kernel.logs.trace_stats(mode.name());

        self.edge1.unaccrue(sweep::last_sweep(masks, sweep_len));

        debug!(
            "{} transform: {} sweeps of {} masks, {} kept, overflow={}",
            mode,
            sweep_count,
            sweep_len,
            ranks.len(),
            overflow
        );
        if overflow {
            warn!("{} transform overflowed; scores are saturated bounds", mode);
        }
        Ok(TransformResult::from_ranks(
            mode,
            sweep_count,
            &ranks,
            request.want_offsets,
            overflow,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineConfig, ModeSet};
    use mask_model::DensityMap;
    use math_cache::scale::scaled_to_f64;
    use rank_list::RankOrder;

    fn context(modes: ModeSet) -> Context {
        Context::from_config(EngineConfig::bytes(modes)).unwrap()
    }

    fn all_entropy() -> ModeSet {
        Mode::ALL
            .into_iter()
            .filter(|m| m.kind() == ModeKind::Entropy)
            .collect()
    }

    fn counts(sweep: &[u32]) -> Vec<u64> {
        let mut counts = vec![0u64; 256];
        for &m in sweep {
            counts[m as usize] += 1;
        }
        counts
    }

    fn ln_gamma(n: u64) -> f64 {
        (2..n).map(|k| (k as f64).ln()).sum()
    }

    fn n_ln_n(n: u64) -> f64 {
        if n == 0 {
            0.0
        } else {
            n as f64 * (n as f64).ln()
        }
    }

    fn shannon(sweep: &[u32]) -> f64 {
        n_ln_n(sweep.len() as u64) - counts(sweep).into_iter().map(n_ln_n).sum::<f64>()
    }

    fn agnentropy(sweep: &[u32], span: u64) -> f64 {
        let w = sweep.len() as u64;
        ln_gamma(w + span)
            - ln_gamma(span)
            - counts(sweep).into_iter().map(|f| ln_gamma(f + 1)).sum::<f64>()
    }

    fn logfreedom(sweep: &[u32], span: u64) -> f64 {
        let w = sweep.len() as u64;
        let counts = counts(sweep);
        let mut populations = vec![0u64; w as usize + 1];
        for &f in &counts {
            populations[f as usize] += 1;
        }
        ln_gamma(w + 1) + ln_gamma(span + 1)
            - counts.iter().map(|&f| ln_gamma(f + 1)).sum::<f64>()
            - populations.iter().map(|&h| ln_gamma(h + 1)).sum::<f64>()
    }

    fn bytes(s: &[u8]) -> Vec<u32> {
        s.iter().map(|&b| b as u32).collect()
    }

    fn dump(ctx: &mut Context, mode: Mode, masks: &[u32], sweep_len: u64) -> TransformResult {
        let request = TransformRequest::new(mode, sweep_len).unranked();
        ctx.transform(&request, masks).unwrap()
    }

    #[test]
    fn test_shannon_runs_rank_lowest() {
        let masks = bytes(b"AAAABBBB");
        let mut ctx = context(ModeSet::single(Mode::Shannon));
        let request = TransformRequest::new(Mode::Shannon, 4).ranked(3, RankOrder::Ascending);
        let result = ctx.transform(&request, &masks).unwrap();

        assert_eq!(result.sweep_count, 5);
        let offsets = result.offsets.clone().unwrap();
        let mut best: Vec<u64> = offsets[..2].to_vec();
        best.sort();
        assert_eq!(best, vec![0, 4]);
        assert!(result.value_f64(0).unwrap() < 1e-12);
        assert!(result.value_f64(1).unwrap() < 1e-12);
        // every straddling window holds both letters
        assert!(result.value_f64(2).unwrap() > 0.5);
        assert!(!result.overflow);
    }

    #[test]
    fn test_shannon_matches_reference() {
        let masks = bytes(b"the quick brown fox jumps over the lazy dog");
        let mut ctx = context(ModeSet::single(Mode::Shannon));
        let result = dump(&mut ctx, Mode::Shannon, &masks, 9);
        assert_eq!(result.len(), masks.len() - 8);
        for (i, value) in result.values_f64().into_iter().enumerate() {
            assert!((value - shannon(&masks[i..i + 9])).abs() < 1e-9, "offset {}", i);
        }
    }

    #[test]
    fn test_agnentropy_matches_reference() {
        let masks = bytes(b"abracadabra, abracadabra!");
        let mut ctx = context(ModeSet::single(Mode::Agnentropy));
        let result = dump(&mut ctx, Mode::Agnentropy, &masks, 7);
        for (i, value) in result.values_f64().into_iter().enumerate() {
            let expected = agnentropy(&masks[i..i + 7], 256);
            assert!((value - expected).abs() < 1e-9, "offset {}", i);
        }
    }

    #[test]
    fn test_logfreedom_matches_reference() {
        let masks = bytes(b"mississippi river banks, mississippi");
        let mut ctx = context(ModeSet::single(Mode::Logfreedom));
        let result = dump(&mut ctx, Mode::Logfreedom, &masks, 11);
        assert!(!result.overflow);
        for (i, value) in result.values_f64().into_iter().enumerate() {
            let expected = logfreedom(&masks[i..i + 11], 256);
            assert!((value - expected).abs() < 1e-9, "offset {}", i);
        }
    }

    #[test]
    fn test_variance_and_kurtosis_match_reference() {
        let masks: Vec<u32> = vec![0, 10, 20, 200, 255, 3, 100, 50, 50, 7, 128, 129];
        let mut ctx = context(ModeSet::single(Mode::Variance).with(Mode::Kurtosis));
        let variance = dump(&mut ctx, Mode::Variance, &masks, 5);
        let kurtosis = dump(&mut ctx, Mode::Kurtosis, &masks, 5);

        let mean = ctx.mean().unwrap();
        let mu = mean.sum as f64 / mean.count as f64;
        for i in 0..variance.len() {
            let d: Vec<f64> = masks[i..i + 5]
                .iter()
                .map(|&m| (mean.biased(m) as f64 - mu) / 256.0)
                .collect();
            let m2 = d.iter().map(|x| x * x).sum::<f64>() / 5.0;
            let m4 = d.iter().map(|x| x.powi(4)).sum::<f64>() / 5.0;
            assert!((variance.value_f64(i).unwrap() - m2).abs() < 1e-12, "offset {}", i);
            let k = kurtosis.value_f64(i).unwrap();
            assert!((k - m4 / (m2 * m2)).abs() < 1e-9 * k.max(1.0), "offset {}", i);
        }
    }

    fn wide_moments(masks: &[u32], sweep_len: usize, kurtosis: bool) -> Vec<Fru128> {
        let mut overflow = false;
        let mean = mean_get(masks, u32::MAX).unwrap();
        let mut moments = Moments::new(mean, sweep_len as u64, kurtosis, &mut overflow);
        for &m in &masks[..sweep_len] {
            moments.accrue(m, 1, &mut overflow);
        }
        let mut scores = vec![moments.score(&mut overflow)];
        for i in sweep_len..masks.len() {
            moments.step(masks[i - sweep_len], masks[i], &mut overflow);
            scores.push(moments.score(&mut overflow));
        }
        assert!(!overflow);
        scores
    }

    #[test]
    fn test_kurtosis_keeps_precision_over_full_span() {
        // deviations of one half against a span of 2^32
        let base = 0x9000_0000u32;
        let masks: Vec<u32> = (0..16).map(|i| base + (i & 1)).collect();
        let one = 1u128 << 64;
        for score in wide_moments(&masks, 8, true) {
            assert!(score.lower() <= one && one <= score.upper(), "{:?}", score);
            assert!(score.upper() - score.lower() < one >> 32, "{:?}", score);
        }
    }

    #[test]
    fn test_wide_moments_match_reference() {
        let offsets = [0u32, 3, 1, 7, 2, 5, 4, 6, 0, 7, 3, 3, 1, 6, 2, 5];
        let masks: Vec<u32> = offsets.iter().map(|&o| 0xC000_0000 + o).collect();
        let mean = mean_get(&masks, u32::MAX).unwrap();
        let n = mean.count as f64;
        let span = 2f64.powi(32);
        let kurtosis = wide_moments(&masks, 5, true);
        let variance = wide_moments(&masks, 5, false);

        for i in 0..kurtosis.len() {
            // N x - Σx is exact in i128
            let e: Vec<f64> = masks[i..i + 5]
                .iter()
                .map(|&m| (m as i128 * mean.count as i128 - mean.sum as i128) as f64)
                .collect();
            let s2 = e.iter().map(|x| x * x).sum::<f64>();
            let s4 = e.iter().map(|x| x.powi(4)).sum::<f64>();
            let k = 5.0 * s4 / (s2 * s2);
            let v = s2 / (n * span).powi(2) / 5.0;

            let got = scaled_to_f64(kurtosis[i]);
            assert!((got - k).abs() < 1e-9 * k, "offset {}: {} vs {}", i, got, k);
            let got = variance[i].to_f64();
            assert!((got - v).abs() < 1e-6 * v, "offset {}: {} vs {}", i, got, v);
        }
    }

    #[test]
    fn test_signed_mean_detected_for_moments() {
        let masks = vec![0, 255, 1, 254, 0, 255];
        let mut ctx = context(ModeSet::single(Mode::Variance));
        let result = dump(&mut ctx, Mode::Variance, &masks, 2);
        let mean = ctx.mean().unwrap();
        assert!(mean.signed);
        assert!((mean.value_f64() + 0.5).abs() < 1e-9);
        // +0 and -1 sit half a step either side of the mean
        assert!(result.values_f64().iter().all(|&v| v < 1e-4));
    }

    #[test]
    fn test_constant_sweep_has_zero_moments() {
        let masks = vec![9, 9, 9, 9];
        let mut ctx = context(ModeSet::single(Mode::Kurtosis));
        let result = dump(&mut ctx, Mode::Kurtosis, &masks, 2);
        assert!(result.scores.iter().all(|&s| s == Fru128::ZERO));
        assert!(!result.overflow);
    }

    #[test]
    fn test_normalised_modes_stay_in_unit_range() {
        let masks = bytes(b"0000000011111111abcdefghijklmnop0000");
        let mut ctx = context(all_entropy());
        for mode in [Mode::Compressivity, Mode::Dyspoissonism, Mode::Shannonism] {
            let result = dump(&mut ctx, mode, &masks, 8);
            for value in result.values_f64() {
                assert!((0.0..=1.0).contains(&value), "{} gave {}", mode, value);
            }
            // the run of zeros is the most compressible sweep
            assert!(result.value_f64(0).unwrap() > result.value_f64(16).unwrap());
        }
    }

    #[test]
    fn test_shannonism_of_distinct_sweep() {
        // 16 distinct masks out of 16: Shannon equals W ln Z
        let masks: Vec<u32> = (0..16).collect();
        let mut ctx = Context::from_config(EngineConfig {
            mask_max: 15,
            ..EngineConfig::bytes(ModeSet::single(Mode::Shannonism))
        })
        .unwrap();
        let result = dump(&mut ctx, Mode::Shannonism, &masks, 16);
        assert!(result.value_f64(0).unwrap() < 1e-12);
    }

    #[test]
    fn test_tables_clean_between_calls() {
        let masks = bytes(b"repeatable results, repeatable results");
        let mut ctx = context(all_entropy());
        for mode in ModeSet::iter(&all_entropy()).collect::<Vec<_>>() {
            let first = dump(&mut ctx, mode, &masks, 6);
            let second = dump(&mut ctx, mode, &masks, 6);
            assert_eq!(first, second, "{}", mode);
            assert_eq!(ctx.edge1.total(), 0);
        }
    }

    #[test]
    fn test_ranked_matches_sorted_dump() {
        let masks = bytes(b"zzzzyyyxxwzzzzaaaabbbbccccddddeeee");
        let mut ctx = context(ModeSet::single(Mode::Agnentropy));
        let all = dump(&mut ctx, Mode::Agnentropy, &masks, 5);
        let mut expected: Vec<(u128, u64)> = all
            .scores
            .iter()
            .zip(all.offsets.unwrap())
            .map(|(s, o)| (s.mean(), o))
            .collect();
        expected.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let request = TransformRequest::new(Mode::Agnentropy, 5).ranked(4, RankOrder::Descending);
        let top = ctx.transform(&request, &masks).unwrap();
        let got: Vec<(u128, u64)> = top
            .scores
            .iter()
            .zip(top.offsets.unwrap())
            .map(|(s, o)| (s.mean(), o))
            .collect();
        assert_eq!(got, expected[..4].to_vec());
    }

    #[test]
    fn test_without_offsets() {
        let masks = bytes(b"abcabc");
        let mut ctx = context(ModeSet::single(Mode::Shannon));
        let request = TransformRequest::new(Mode::Shannon, 3).without_offsets();
        let result = ctx.transform(&request, &masks).unwrap();
        assert_eq!(result.offsets, None);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_rejects_out_of_range_mask_without_touching_tables() {
        let mut ctx = Context::from_config(EngineConfig {
            mask_max: 15,
            ..EngineConfig::bytes(ModeSet::single(Mode::Shannon))
        })
        .unwrap();
        let request = TransformRequest::new(Mode::Shannon, 2);
        assert!(matches!(
            ctx.transform(&request, &[1, 2, 16]),
            Err(EngineError::Mask(mask_model::MaskError::MaskOutOfRange { index: 2, .. }))
        ));
        assert_eq!(ctx.edge1.total(), 0);
    }

    #[test]
    fn test_densified_span_under_override() {
        let raw = bytes(b"\x10\x10\x10\x80\x80\xF0\x10\x80");
        let mut used = mask_model::UsedBitmap::try_new(255).unwrap();
        used.mark(&raw).unwrap();
        let map = DensityMap::build(&used).unwrap();
        let mut dense = raw.clone();
        map.densify(&mut dense).unwrap();
        assert_eq!(map.mask_max(), 2);

        let mut ctx = context(ModeSet::single(Mode::Shannonism));
        let request = TransformRequest::new(Mode::Shannonism, 8);
        let full = ctx.transform(&request, &dense).unwrap();
        let narrowed = {
            let mut guard = ctx.override_mask_max(map.mask_max()).unwrap();
            guard.transform(&request, &dense).unwrap()
        };
        // the same entropy against ln 3 rather than ln 256 is less compressible
        assert!(narrowed.value_f64(0).unwrap() < full.value_f64(0).unwrap());
        assert_eq!(ctx.mask_max(), 255);
    }
}
