//! Sliding-window driver shared by every metric
//!
//! The first sweep is accrued in full. Each later offset drops one mask off
//! the trailing edge and takes one on at the leading edge; kernels fold that
//! exchange into their running sums in constant time.

use fracterval::Fru128;
use mask_model::FreqTable;
use rank_list::RankList;

/// A running metric over the current sweep
pub(crate) trait SweepKernel {
    /// Moves one mask out of the sweep and another in. Never called with
    /// equal masks.
    fn step(&mut self, exiting: u32, entering: u32, overflow: &mut bool);

    /// Score of the current sweep
    fn score(&mut self, overflow: &mut bool) -> Fru128;
}

/// Accrues the first sweep into `sweep`, collecting each distinct mask once.
pub(crate) fn begin(sweep: &mut FreqTable, distinct: &mut Vec<u32>, masks: &[u32]) {
    distinct.clear();
    for &mask in masks {
        if sweep.increment(mask) == 1 {
            distinct.push(mask);
        }
    }
}

/// Scores every sweep of `masks`, offering each to `ranks`. Returns the
/// number of sweeps.
pub(crate) fn run<K: SweepKernel>(
    kernel: &mut K,
    masks: &[u32],
    sweep_len: usize,
    ranks: &mut RankList,
    overflow: &mut bool,
) -> u64 {
    let sweep_count = masks.len() - sweep_len + 1;
    let mut score = kernel.score(overflow);
    ranks.insert(score, 0);

    for (base, (&exiting, &entering)) in masks.iter().zip(&masks[sweep_len..]).enumerate() {
        if exiting != entering {
            kernel.step(exiting, entering, overflow);
            score = kernel.score(overflow);
        }
        ranks.insert(score, base as u64 + 1);
    }
    sweep_count as u64
}

/// The last sweep of `masks`, the one left accrued after `run`
pub(crate) fn last_sweep(masks: &[u32], sweep_len: usize) -> &[u32] {
    &masks[masks.len() - sweep_len..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rank_list::RankOrder;

    /// Sum of masks in the sweep
    struct Sum {
        total: u128,
        steps: usize,
    }

    impl SweepKernel for Sum {
        fn step(&mut self, exiting: u32, entering: u32, _: &mut bool) {
            self.total = self.total - exiting as u128 + entering as u128;
            self.steps += 1;
        }

        fn score(&mut self, _: &mut bool) -> Fru128 {
            Fru128::fractoid(self.total)
        }
    }

    #[test]
    fn test_run_visits_every_offset() {
        let masks = [1, 2, 3, 3, 4];
        let mut kernel = Sum { total: 6, steps: 0 };
        let mut ranks = RankList::try_new(8, RankOrder::Unranked).unwrap();
        let mut overflow = false;
        let count = run(&mut kernel, &masks, 3, &mut ranks, &mut overflow);

        assert_eq!(count, 3);
        let totals: Vec<u128> = ranks.scores().map(|s| s.lower()).collect();
        assert_eq!(totals, vec![6, 8, 10]);
        assert_eq!(ranks.offsets().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(kernel.steps, 2);
    }

    #[test]
    fn test_equal_exchange_skips_step() {
        let masks = [5, 1, 5, 1, 5];
        let mut kernel = Sum { total: 6, steps: 0 };
        let mut ranks = RankList::try_new(1, RankOrder::Descending).unwrap();
        let mut overflow = false;
        run(&mut kernel, &masks, 2, &mut ranks, &mut overflow);
        assert_eq!(kernel.steps, 0);
        assert_eq!(ranks.offsets().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_begin_collects_distinct() {
        let mut table = FreqTable::try_new(15).unwrap();
        let mut distinct = Vec::new();
        begin(&mut table, &mut distinct, &[3, 1, 3, 3, 9]);
        assert_eq!(distinct, vec![3, 1, 9]);
        assert_eq!(table.count(3), 3);
        assert_eq!(table.total(), 5);
        assert_eq!(last_sweep(&[1, 2, 3, 4], 3), &[2, 3, 4]);
    }
}
