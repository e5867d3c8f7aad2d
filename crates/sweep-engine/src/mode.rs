//! Transform modes and the capability model
//!
//! Every mode declares which tables and caches it needs. A context takes the
//! union over its enabled modes once, at construction, to decide what to
//! allocate and how large.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One sweep statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Log-gamma combinatorial entropy
    Agnentropy,
    /// Agnentropy normalised to [0, 1]
    Compressivity,
    /// Entropy of the frequency-of-frequencies distribution
    Logfreedom,
    /// Logfreedom normalised to [0, 1]
    Dyspoissonism,
    /// Shannon entropy in nats
    Shannon,
    /// Shannon entropy normalised to [0, 1]
    Shannonism,
    /// Obtuse kurtosis against the global mean
    Kurtosis,
    /// Obtuse variance against the global mean
    Variance,
    /// Cross-entropy of the sweep against the needle
    Diventropy,
    /// Diventropy normalised to [0, 1]
    Divcompressivity,
    /// Jensen-Shannon divergence in bits
    Jsd,
    /// Jensen-Shannon similarity, `1 - jsd`
    Jss,
    /// Leidich divergence
    Ld,
    /// Leidich similarity, `1 - ld`
    Ls,
    /// Entropy of the sweep against its complement
    Exoentropy,
    /// Shannon entropy relative to exoentropy, normalised to [0, 1]
    Exoelasticity,
}

/// Whether a mode scores one distribution or compares two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Entropy,
    Divergence,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeKind::Entropy => write!(f, "entropy"),
            ModeKind::Divergence => write!(f, "divergence"),
        }
    }
}

/// What a mode needs from its context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capability {
    /// A preloaded needle frequency table
    pub needle: bool,
    /// A complement table built from the haystack itself
    pub complement: bool,
    /// Memoized log-deltas
    pub log_delta: bool,
    /// The shared log-gamma table
    pub log_gamma: bool,
    /// The frequency-population histogram
    pub population: bool,
    /// A global mean from sign detection
    pub mean: bool,
    /// Suggested log cache size as a power of two
    pub log_cache_bits: u32,
}

impl Capability {
    pub const NONE: Self = Self {
        needle: false,
        complement: false,
        log_delta: false,
        log_gamma: false,
        population: false,
        mean: false,
        log_cache_bits: 0,
    };

    /// Needs of both capabilities together
    pub const fn union(self, other: Self) -> Self {
        Self {
            needle: self.needle || other.needle,
            complement: self.complement || other.complement,
            log_delta: self.log_delta || other.log_delta,
            log_gamma: self.log_gamma || other.log_gamma,
            population: self.population || other.population,
            mean: self.mean || other.mean,
            log_cache_bits: if self.log_cache_bits > other.log_cache_bits {
                self.log_cache_bits
            } else {
                other.log_cache_bits
            },
        }
    }

    /// Whether an edge-0 table is needed, for a needle or a complement
    pub const fn edge0(&self) -> bool {
        self.needle || self.complement
    }
}

const AGNENTROPY: Capability = Capability {
    log_gamma: true,
    log_cache_bits: 12,
    ..Capability::NONE
};

const LOGFREEDOM: Capability = Capability {
    log_gamma: true,
    population: true,
    log_cache_bits: 16,
    ..Capability::NONE
};

const SHANNON: Capability = Capability {
    log_delta: true,
    log_cache_bits: 16,
    ..Capability::NONE
};

const MOMENTS: Capability = Capability {
    mean: true,
    log_cache_bits: 4,
    ..Capability::NONE
};

const NEEDLE: Capability = Capability {
    needle: true,
    log_delta: true,
    log_cache_bits: 18,
    ..Capability::NONE
};

const EXO: Capability = Capability {
    complement: true,
    log_delta: true,
    log_cache_bits: 20,
    ..Capability::NONE
};

impl Mode {
    /// Every mode, in declaration order
    pub const ALL: [Mode; 16] = [
        Mode::Agnentropy,
        Mode::Compressivity,
        Mode::Logfreedom,
        Mode::Dyspoissonism,
        Mode::Shannon,
        Mode::Shannonism,
        Mode::Kurtosis,
        Mode::Variance,
        Mode::Diventropy,
        Mode::Divcompressivity,
        Mode::Jsd,
        Mode::Jss,
        Mode::Ld,
        Mode::Ls,
        Mode::Exoentropy,
        Mode::Exoelasticity,
    ];

    pub const fn kind(self) -> ModeKind {
        match self {
            Mode::Agnentropy
            | Mode::Compressivity
            | Mode::Logfreedom
            | Mode::Dyspoissonism
            | Mode::Shannon
            | Mode::Shannonism
            | Mode::Kurtosis
            | Mode::Variance => ModeKind::Entropy,
            _ => ModeKind::Divergence,
        }
    }

    /// Whether scores are plain fractions in [0, 1]. Other modes report nats
    /// (kurtosis a bare ratio) in 64.64 fixed point.
    pub const fn is_unit(self) -> bool {
        matches!(
            self,
            Mode::Compressivity
                | Mode::Dyspoissonism
                | Mode::Shannonism
                | Mode::Variance
                | Mode::Divcompressivity
                | Mode::Jsd
                | Mode::Jss
                | Mode::Ld
                | Mode::Ls
                | Mode::Exoelasticity
        )
    }

    pub const fn capability(self) -> Capability {
        match self {
            Mode::Agnentropy | Mode::Compressivity => AGNENTROPY,
            Mode::Logfreedom | Mode::Dyspoissonism => LOGFREEDOM,
            Mode::Shannon | Mode::Shannonism => SHANNON,
            Mode::Kurtosis | Mode::Variance => MOMENTS,
            Mode::Diventropy
            | Mode::Divcompressivity
            | Mode::Jsd
            | Mode::Jss
            | Mode::Ld
            | Mode::Ls => NEEDLE,
            Mode::Exoentropy | Mode::Exoelasticity => EXO,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Mode::Agnentropy => "agnentropy",
            Mode::Compressivity => "compressivity",
            Mode::Logfreedom => "logfreedom",
            Mode::Dyspoissonism => "dyspoissonism",
            Mode::Shannon => "shannon",
            Mode::Shannonism => "shannonism",
            Mode::Kurtosis => "kurtosis",
            Mode::Variance => "variance",
            Mode::Diventropy => "diventropy",
            Mode::Divcompressivity => "divcompressivity",
            Mode::Jsd => "jsd",
            Mode::Jss => "jss",
            Mode::Ld => "ld",
            Mode::Ls => "ls",
            Mode::Exoentropy => "exoentropy",
            Mode::Exoelasticity => "exoelasticity",
        }
    }

    #[inline]
    const fn bit(self) -> u32 {
        1 << self as u32
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of enabled modes. Serialises as a list of mode names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Mode>", into = "Vec<Mode>")]
pub struct ModeSet(u32);

impl ModeSet {
    pub const EMPTY: Self = Self(0);

    pub const fn single(mode: Mode) -> Self {
        Self(mode.bit())
    }

    /// This set plus `mode`
    pub const fn with(self, mode: Mode) -> Self {
        Self(self.0 | mode.bit())
    }

    pub fn insert(&mut self, mode: Mode) {
        self.0 |= mode.bit();
    }

    pub const fn contains(&self, mode: Mode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = Mode> + '_ {
        Mode::ALL.into_iter().filter(|&m| self.contains(m))
    }

    /// Whether kurtosis or variance is enabled
    pub const fn has_moments(&self) -> bool {
        self.contains(Mode::Kurtosis) || self.contains(Mode::Variance)
    }

    /// Union of every enabled mode's needs
    pub fn capability(&self) -> Capability {
        self.iter()
            .map(Mode::capability)
            .fold(Capability::NONE, Capability::union)
    }
}

impl FromIterator<Mode> for ModeSet {
    fn from_iter<I: IntoIterator<Item = Mode>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for mode in iter {
            set.insert(mode);
        }
        set
    }
}

impl From<Vec<Mode>> for ModeSet {
    fn from(modes: Vec<Mode>) -> Self {
        modes.into_iter().collect()
    }
}

impl From<ModeSet> for Vec<Mode> {
    fn from(set: ModeSet) -> Self {
        set.iter().collect()
    }
}
