//! Divergence transforms
//!
//! A sweep with frequencies `f` is compared against the needle, with
//! frequencies `g` and `Q` masks in total, or for exo modes against its own
//! complement `c` (the haystack minus the sweep). As with single-distribution
//! modes, only the two masks changing membership touch the running sums.

use fracterval::{Fru128, Reciprocal, LN2};
use mask_model::FreqTable;
use rank_list::RankList;
use tracing::{debug, warn};

use crate::context::Context;
use crate::convert::compressivity;
use crate::logs::ScaledLogs;
use crate::sweep::{self, SweepKernel};
use crate::{EngineError, Mode, ModeKind, Normalizer, TransformRequest, TransformResult};

/// Sizes fixed for one divergence call
#[derive(Debug, Clone, Copy)]
struct Shape {
    /// Needle mask count `Q`
    needle_count: u64,
    /// Haystack mask count `N`
    haystack_len: u64,
    /// Sweep mask count `W`
    sweep_len: u64,
    /// Mask span `Z`
    span: u64,
}

/// `ln n + k (ln n - ln(n-1))`, the change in `k ln(n-1) -> (k+1) ln n`
/// style terms when one count steps across `n`
#[inline]
fn step_term(logs: &mut ScaledLogs<'_>, n: u64, k: u64, overflow: &mut bool) -> Fru128 {
    let ln = logs.ln(n, overflow);
    if k == 0 {
        return ln;
    }
    ln.add(logs.ld(n, overflow).multiply_u64(k, overflow), overflow)
}

/// Per-mask mixture terms of the Jensen-Shannon divergence
///
/// With `u = gW + fQ`, the mixture weight of a mask is `m = u / 2QW`, held
/// as `g/2Q + f/2W` so the hot loop never divides.
#[derive(Debug, Clone, Copy)]
struct Mixture {
    needle_count: u64,
    sweep_len: u64,
    /// `2QW`, the value of `u` when one mask is the whole of both
    total: u64,
    half_needle: Fru128,
    half_sweep: Fru128,
}

impl Mixture {
    fn new(shape: &Shape, overflow: &mut bool) -> Self {
        let q = shape.needle_count;
        let w = shape.sweep_len;
        Self {
            needle_count: q,
            sweep_len: w,
            total: 2 * q * w,
            half_needle: Fru128::from_ratio(1, 2 * q as u128, overflow),
            half_sweep: Fru128::from_ratio(1, 2 * w as u128, overflow),
        }
    }

    /// `m ln u` in the accumulator scale
    #[inline]
    fn term(&self, logs: &mut ScaledLogs<'_>, g: u64, f: u64, overflow: &mut bool) -> Fru128 {
        let u = g * self.sweep_len + f * self.needle_count;
        if u == 0 {
            return Fru128::ZERO;
        }
        let m = if u == self.total {
            Fru128::ONE
        } else {
            self.half_needle
                .multiply_u64(g, overflow)
                .add(self.half_sweep.multiply_u64(f, overflow), overflow)
        };
        m.multiply(logs.ln(u, overflow))
    }
}

enum Metric {
    /// `V = Σ f ln(g+f)`
    Diventropy { w_ln_total: Fru128, sum: Fru128 },
    /// `S = Σ f ln f` and `U = Σ m ln u`
    Jensen {
        mixture: Mixture,
        constant: Fru128,
        self_sum: Fru128,
        mix_sum: Fru128,
        per_bit: Reciprocal,
        similarity: bool,
    },
    /// `T = Σ (g+f) ln(g+f)` and `F = Σ f ln f` against the fixed `Σ g ln g`
    Leidich {
        joint_sum: Fru128,
        needle_sum: Fru128,
        self_sum: Fru128,
        per_max: Reciprocal,
        similarity: bool,
    },
    /// `X = Σ f ln(c+1)`, plus Shannon's `Σ f ln f` for elasticity
    Exo {
        raw: Fru128,
        cross_sum: Fru128,
        w_ln_w: Fru128,
        self_sum: Fru128,
        elasticity: bool,
    },
}

/// Running state of one divergence transform
pub(crate) struct DivergenceKernel<'a> {
    sweep: &'a mut FreqTable,
    /// Needle frequencies, or the complement for exo modes
    other: &'a mut FreqTable,
    logs: ScaledLogs<'a>,
    metric: Metric,
    normalizer: Option<Normalizer>,
}

impl<'a> DivergenceKernel<'a> {
    /// Builds the kernel over the first sweep, already accrued into `sweep`.
    #[allow(clippy::too_many_arguments)]
    fn new(
        mode: Mode,
        sweep: &'a mut FreqTable,
        other: &'a mut FreqTable,
        distinct: &[u32],
        needle_distinct: &[u32],
        mut logs: ScaledLogs<'a>,
        shape: Shape,
        normalizer: Option<Normalizer>,
        overflow: &mut bool,
    ) -> Result<Self, EngineError> {
        let w = shape.sweep_len;
        let q = shape.needle_count;
        let mut self_sum = Fru128::ZERO;
        for &m in distinct {
            let f = sweep.count(m) as u64;
            self_sum = self_sum.add(logs.n_ln_n(f, overflow), overflow);
        }

        let metric = match mode {
            Mode::Diventropy | Mode::Divcompressivity => {
                let w_ln_total = logs.ln(q + w, overflow).multiply_u64(w, overflow);
                let mut sum = Fru128::ZERO;
                for &m in distinct {
                    let f = sweep.count(m) as u64;
                    let g = other.count(m) as u64;
                    sum = sum.add(logs.ln(g + f, overflow).multiply_u64(f, overflow), overflow);
                }
                Metric::Diventropy { w_ln_total, sum }
            }
            Mode::Jsd | Mode::Jss => {
                let mixture = Mixture::new(&shape, overflow);
                let mut needle_sum = Fru128::ZERO;
                let mut mix_sum = Fru128::ZERO;
                for &m in needle_distinct {
                    let g = other.count(m) as u64;
                    let f = sweep.count(m) as u64;
                    needle_sum = needle_sum.add(logs.n_ln_n(g, overflow), overflow);
                    mix_sum = mix_sum.add(mixture.term(&mut logs, g, f, overflow), overflow);
                }
                for &m in distinct {
                    if other.count(m) == 0 {
                        let f = sweep.count(m) as u64;
                        mix_sum = mix_sum.add(mixture.term(&mut logs, 0, f, overflow), overflow);
                    }
                }

                // ln 2 + (ln Q + ln W)/2 + Σ g ln g / 2Q
                let ln2 = LN2.shift_right(64);
                let constant = logs
                    .ln(q, overflow)
                    .add(logs.ln(w, overflow), overflow)
                    .shift_right(1)
                    .add(ln2, overflow)
                    .add(needle_sum.multiply(mixture.half_needle), overflow);
                Metric::Jensen {
                    mixture,
                    constant,
                    self_sum,
                    mix_sum,
                    per_bit: Reciprocal::new(ln2, overflow),
                    similarity: mode == Mode::Jss,
                }
            }
            Mode::Ld | Mode::Ls => {
                let mut needle_sum = Fru128::ZERO;
                let mut joint_sum = Fru128::ZERO;
                for &m in needle_distinct {
                    let g = other.count(m) as u64;
                    let f = sweep.count(m) as u64;
                    needle_sum = needle_sum.add(logs.n_ln_n(g, overflow), overflow);
                    joint_sum = joint_sum.add(logs.n_ln_n(g + f, overflow), overflow);
                }
                for &m in distinct {
                    if other.count(m) == 0 {
                        let f = sweep.count(m) as u64;
                        joint_sum = joint_sum.add(logs.n_ln_n(f, overflow), overflow);
                    }
                }

                // divergence of two disjoint distributions
                let max = logs
                    .n_ln_n(q + w, overflow)
                    .subtract_clamped(logs.n_ln_n(q, overflow), overflow)
                    .subtract_clamped(logs.n_ln_n(w, overflow), overflow);
                Metric::Leidich {
                    joint_sum,
                    needle_sum,
                    self_sum,
                    per_max: Reciprocal::new(max, overflow),
                    similarity: mode == Mode::Ls,
                }
            }
            Mode::Exoentropy | Mode::Exoelasticity => {
                // add-one smoothing over the complement: N - W + Z outcomes
                let outcomes = shape.haystack_len - w + shape.span;
                let raw = logs.ln(outcomes, overflow).multiply_u64(w, overflow);
                let mut cross_sum = Fru128::ZERO;
                for &m in distinct {
                    let f = sweep.count(m) as u64;
                    let c = other.count(m) as u64;
                    cross_sum = cross_sum.add(logs.ln(c + 1, overflow).multiply_u64(f, overflow), overflow);
                }
                Metric::Exo {
                    raw,
                    cross_sum,
                    w_ln_w: logs.n_ln_n(w, overflow),
                    self_sum,
                    elasticity: mode == Mode::Exoelasticity,
                }
            }
            _ => {
                return Err(EngineError::ModeKind {
                    mode,
                    expected: ModeKind::Divergence,
                })
            }
        };

        Ok(Self {
            sweep,
            other,
            logs,
            metric,
            normalizer,
        })
    }
}

impl SweepKernel for DivergenceKernel<'_> {
    fn step(&mut self, exiting: u32, entering: u32, overflow: &mut bool) {
        let logs = &mut self.logs;
        // x and y are sweep counts before the move
        let x = self.sweep.decrement(exiting) as u64 + 1;
        let y = self.sweep.increment(entering) as u64 - 1;

        match &mut self.metric {
            Metric::Diventropy { sum, .. } => {
                let ga = self.other.count(exiting) as u64;
                let gb = self.other.count(entering) as u64;
                let gain = step_term(logs, gb + y + 1, y, overflow);
                let loss = step_term(logs, ga + x, x - 1, overflow);
                *sum = sum.add(gain, overflow).subtract_clamped(loss, overflow);
            }
            Metric::Jensen {
                mixture,
                self_sum,
                mix_sum,
                ..
            } => {
                let ga = self.other.count(exiting) as u64;
                let gb = self.other.count(entering) as u64;
                let gains = mixture
                    .term(logs, ga, x - 1, overflow)
                    .add(mixture.term(logs, gb, y + 1, overflow), overflow);
                let losses = mixture
                    .term(logs, ga, x, overflow)
                    .add(mixture.term(logs, gb, y, overflow), overflow);
                *mix_sum = mix_sum.add(gains, overflow).subtract_clamped(losses, overflow);
                *self_sum = self_sum
                    .add(logs.gd(y + 1, overflow), overflow)
                    .subtract_clamped(logs.gd(x, overflow), overflow);
            }
            Metric::Leidich {
                joint_sum,
                self_sum,
                ..
            } => {
                let ga = self.other.count(exiting) as u64;
                let gb = self.other.count(entering) as u64;
                *joint_sum = joint_sum
                    .add(logs.gd(gb + y + 1, overflow), overflow)
                    .subtract_clamped(logs.gd(ga + x, overflow), overflow);
                *self_sum = self_sum
                    .add(logs.gd(y + 1, overflow), overflow)
                    .subtract_clamped(logs.gd(x, overflow), overflow);
            }
            Metric::Exo {
                cross_sum,
                self_sum,
                elasticity,
                ..
            } => {
                // the exiting mask joins the complement, the entering one leaves it
                let ca = self.other.increment(exiting) as u64 - 1;
                let cb = self.other.decrement(entering) as u64 + 1;
                let gains = logs
                    .ld(ca + 2, overflow)
                    .multiply_u64(x - 1, overflow)
                    .add(logs.ln(cb, overflow), overflow);
                let losses = logs
                    .ln(ca + 1, overflow)
                    .add(logs.ld(cb + 1, overflow).multiply_u64(y, overflow), overflow);
                *cross_sum = cross_sum.add(gains, overflow).subtract_clamped(losses, overflow);
                if *elasticity {
                    *self_sum = self_sum
                        .add(logs.gd(y + 1, overflow), overflow)
                        .subtract_clamped(logs.gd(x, overflow), overflow);
                }
            }
        }
    }

    fn score(&mut self, overflow: &mut bool) -> Fru128 {
        // normalised ratios below are truly at most one, so clipping is sound
        let mut clipped = false;
        match &self.metric {
            Metric::Diventropy { w_ln_total, sum } => {
                let entropy = w_ln_total.subtract_clamped(*sum, overflow);
                match &self.normalizer {
                    Some(normalizer) => normalizer.compressivity(entropy, overflow),
                    None => entropy,
                }
            }
            Metric::Jensen {
                mixture,
                constant,
                self_sum,
                mix_sum,
                per_bit,
                similarity,
            } => {
                let nats = constant
                    .add(self_sum.multiply(mixture.half_sweep), overflow)
                    .subtract_clamped(*mix_sum, overflow);
                let bits = per_bit.apply(nats, &mut clipped);
                if *similarity {
                    bits.not()
                } else {
                    bits
                }
            }
            Metric::Leidich {
                joint_sum,
                needle_sum,
                self_sum,
                per_max,
                similarity,
            } => {
                let shared = joint_sum
                    .subtract_clamped(*needle_sum, overflow)
                    .subtract_clamped(*self_sum, overflow);
                let ls = per_max.apply(shared, &mut clipped);
                if *similarity {
                    ls
                } else {
                    ls.not()
                }
            }
            Metric::Exo {
                raw,
                cross_sum,
                w_ln_w,
                self_sum,
                elasticity,
            } => {
                let exo = raw.subtract_clamped(*cross_sum, overflow);
                if *elasticity {
                    let shannon = w_ln_w.subtract_clamped(*self_sum, overflow);
                    compressivity(shannon, exo, overflow)
                } else {
                    exo
                }
            }
        }
    }
}

impl Context {
    /// Scores every sweep of `masks` against the loaded needle, or for exo
    /// modes against the rest of `masks`.
    ///
    /// Exo modes reuse the needle table, so they unload any needle.
    pub fn divergence_transform(
        &mut self,
        request: &TransformRequest,
        masks: &[u32],
    ) -> Result<TransformResult, EngineError> {
        let (sweep_len, sweep_count) = self.check_request(request, masks, ModeKind::Divergence)?;
        let mode = request.mode;
        let exo = mode.capability().complement;
        if !exo && !self.needle.loaded {
            return Err(EngineError::NeedleMissing(mode));
        }
        if matches!(mode, Mode::Jsd | Mode::Jss) {
            // u = gW + fQ must fit, up to 2QW
            let fits = self
                .needle
                .count
                .checked_mul(request.sweep_len)
                .and_then(|qw| qw.checked_mul(2))
                .is_some();
            if !fits {
                return Err(EngineError::ProductTooLarge(mode));
            }
        }
        let mut ranks = RankList::try_new(request.capacity(sweep_count), request.order)?;

        let mut overflow = false;
        let normalizer = (mode == Mode::Divcompressivity).then(|| {
            let raw = self.raw_entropy(request.sweep_len, &mut overflow);
            Normalizer::new(raw, &mut overflow)
        });
        let shape = Shape {
            needle_count: self.needle.count,
            haystack_len: masks.len() as u64,
            sweep_len: request.sweep_len,
            span: self.span(),
        };

        let Context {
            edge0,
            edge1,
            distinct,
            needle,
            logs,
            ..
        } = &mut *self;
        let Some(other) = edge0.as_mut() else {
            return Err(EngineError::ModeNotEnabled(mode));
        };

        if exo {
            if needle.loaded {
                other.clear();
                needle.reset();
            }
            other.accrue(masks);
        }
        sweep::begin(edge1, distinct, &masks[..sweep_len]);
        if exo {
            other.subtract_table(edge1)?;
        }

        let mut kernel = DivergenceKernel::new(
            mode,
            edge1,
            other,
            distinct,
            &needle.distinct,
            ScaledLogs::new(logs),
            shape,
            normalizer,
            &mut overflow,
        )?;
        sweep::run(&mut kernel, masks, sweep_len, &mut ranks, &mut overflow);
        kernel.logs.trace_stats(mode.name());

        let last = sweep::last_sweep(masks, sweep_len);
        self.edge1.unaccrue(last);
        if exo {
            if let Some(complement) = self.edge0.as_mut() {
                complement.accrue(last);
                complement.unaccrue(masks);
            }
        }

        debug!(
            "{} transform: {} sweeps of {} masks against {} masks, {} kept, overflow={}",
            mode,
            sweep_count,
            sweep_len,
            if exo { masks.len() as u64 - request.sweep_len } else { shape.needle_count },
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
