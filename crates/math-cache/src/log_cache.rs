//! Direct-Mapped Log Cache
//!
//! Small integer arguments recur constantly as a sweep slides, so logs and
//! log-deltas are memoized in power-of-two tables indexed by the low bits of
//! the argument. A miss evaluates exactly and overwrites the slot.

use fracterval::{log_delta_u64, log_u64, Fru64};
use tracing::trace;

use crate::alloc::filled;
use crate::CacheError;

/// Smallest supported table size, as a power of two
pub const MIN_BITS: u32 = 4;
/// Largest supported table size, as a power of two
pub const MAX_BITS: u32 = 24;

/// Key marking an empty slot. Arguments below 2 never reach the table.
const EMPTY: u64 = 0;

/// One direct-mapped table
struct Table {
    keys: Vec<u64>,
    values: Vec<Fru64>,
    mask: u64,
}

impl Table {
    fn new(bits: u32, what: &'static str) -> Result<Self, CacheError> {
        let len = 1usize << bits;
        Ok(Self {
            keys: filled(len, EMPTY, what)?,
            values: filled(len, Fru64::ZERO, what)?,
            mask: len as u64 - 1,
        })
    }

    #[inline]
    fn lookup(
        &mut self,
        n: u64,
        stats: &mut CacheStats,
        overflow: &mut bool,
        eval: fn(u64, &mut bool) -> Fru64,
    ) -> Fru64 {
        let slot = (n & self.mask) as usize;
        if self.keys[slot] == n {
            stats.hits += 1;
            return self.values[slot];
        }
        stats.misses += 1;
        let value = eval(n, overflow);
        self.keys[slot] = n;
        self.values[slot] = value;
        value
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the table
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoized `ln(n)/64` and `ln(n) - ln(n-1)`
pub struct LogCache {
    log: Table,
    delta: Option<Table>,
    bits: u32,
    stats: CacheStats,
}

impl LogCache {
    /// Create a cache with `2^bits` slots per table. The log-delta table is
    /// allocated only when `with_delta` is set.
    pub fn new(bits: u32, with_delta: bool) -> Result<Self, CacheError> {
        if !(MIN_BITS..=MAX_BITS).contains(&bits) {
            return Err(CacheError::InvalidBits {
                bits,
                min: MIN_BITS,
                max: MAX_BITS,
            });
        }
        let log = Table::new(bits, "log cache")?;
        let delta = if with_delta {
            Some(Table::new(bits, "log-delta cache")?)
        } else {
            None
        };
        Ok(Self {
            log,
            delta,
            bits,
            stats: CacheStats::default(),
        })
    }

    /// Table size as a power of two
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Whether log-deltas are memoized
    pub fn has_delta(&self) -> bool {
        self.delta.is_some()
    }

    /// `ln(n)/64`. `ln(0)` raises `overflow`.
    #[inline]
    pub fn log(&mut self, n: u64, overflow: &mut bool) -> Fru64 {
        if n < 2 {
            return log_u64(n, overflow).narrow();
        }
        self.log.lookup(n, &mut self.stats, overflow, exact_log)
    }

    /// `ln(n) - ln(n-1)`, zero for `n <= 1`.
    #[inline]
    pub fn log_delta(&mut self, n: u64, overflow: &mut bool) -> Fru64 {
        if n < 2 {
            return Fru64::ZERO;
        }
        match self.delta.as_mut() {
            Some(table) => table.lookup(n, &mut self.stats, overflow, exact_log_delta),
            None => {
                self.stats.misses += 1;
                exact_log_delta(n, overflow)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    /// Emits the counters at trace level and clears them.
    pub fn trace_stats(&mut self, label: &str) {
        trace!(
            "{} log cache: {} hits, {} misses ({:.1}% hit ratio)",
            label,
            self.stats.hits,
            self.stats.misses,
            self.stats.hit_ratio() * 100.0
        );
        self.reset_stats();
    }
}

fn exact_log(n: u64, overflow: &mut bool) -> Fru64 {
    log_u64(n, overflow).narrow()
}

fn exact_log_delta(n: u64, overflow: &mut bool) -> Fru64 {
    log_delta_u64(n, overflow).narrow()
}
