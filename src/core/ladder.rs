//! core/ladder.rs — Ordered log10 length scales and the fixed pairs tested on them.
//!
//! Every value is log10(length / 1 m). A structure is identified only by its
//! position; names are carried for reporting. Example: the proton (-15.08)
//! and the Sun (8.84) sit 23.92 decades apart.

use crate::core::error::{OctaveError, Result};

/// Index pair (small, large) into a scale sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PairSpec {
    pub small: usize,
    pub large: usize,
}

impl PairSpec {
    pub const fn new(small: usize, large: usize) -> Self {
        Self { small, large }
    }

    /// Largest index referenced by this pair.
    #[inline]
    pub fn max_index(&self) -> usize {
        self.small.max(self.large)
    }
}

impl From<(usize, usize)> for PairSpec {
    fn from((small, large): (usize, usize)) -> Self {
        Self::new(small, large)
    }
}

pub const CANONICAL_NAMES: [&str; 15] = [
    "Proton",
    "Atomic Orbital (H)",
    "Ribosome",
    "Bacterium",
    "C. elegans",
    "Human",
    "City",
    "Earth",
    "Sun",
    "Solar System",
    "Open Cluster",
    "Local Bubble",
    "Milky Way",
    "Virgo Supercluster",
    "Observable Universe",
];

pub const CANONICAL_LOGS: [f64; 15] = [
    -15.08, -10.28, -7.96, -6.00, -3.30, -0.046, 3.00, 6.80, 8.84, 12.65, 16.67, 18.665, 20.70,
    23.84, 26.64,
];

/// Rungs of the canonical ladder: each small structure against the one 8 places up.
pub const CANONICAL_PAIRS: [PairSpec; 7] = [
    PairSpec::new(0, 8),
    PairSpec::new(1, 9),
    PairSpec::new(2, 10),
    PairSpec::new(3, 11),
    PairSpec::new(4, 12),
    PairSpec::new(5, 13),
    PairSpec::new(6, 14),
];

/// Check that every pair fits inside a sequence of `len` values.
pub fn validate_pairs(len: usize, pairs: &[PairSpec]) -> Result<()> {
    for (k, p) in pairs.iter().enumerate() {
        let index = p.max_index();
        if index >= len {
            return Err(OctaveError::PairIndexOutOfRange {
                pair: k,
                index,
                len,
            });
        }
    }
    Ok(())
}

/// Immutable named scale sequence plus the pairs to score on it.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaleDataset {
    names: Vec<String>,
    values: Vec<f64>,
    pairs: Vec<PairSpec>,
}

impl ScaleDataset {
    pub fn new(names: Vec<String>, values: Vec<f64>, pairs: Vec<PairSpec>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(OctaveError::LengthMismatch {
                names: names.len(),
                values: values.len(),
            });
        }
        validate_pairs(values.len(), &pairs)?;
        Ok(Self {
            names,
            values,
            pairs,
        })
    }

    /// The 15-structure ladder with its 7 canonical rungs.
    pub fn canonical() -> Self {
        Self {
            names: CANONICAL_NAMES.iter().map(|s| s.to_string()).collect(),
            values: CANONICAL_LOGS.to_vec(),
            pairs: CANONICAL_PAIRS.to_vec(),
        }
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[inline]
    pub fn pairs(&self) -> &[PairSpec] {
        &self.pairs
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn name_of(&self, i: usize) -> Option<&str> {
        self.names.get(i).map(String::as_str)
    }

    /// "small -> large" label for reporting a pair.
    pub fn pair_label(&self, pair: PairSpec) -> String {
        format!(
            "{} -> {}",
            self.name_of(pair.small).unwrap_or("?"),
            self.name_of(pair.large).unwrap_or("?")
        )
    }
}
