//! Confidence classification for feature statistics.
//!
//! Maps (entry count, dispersion, data coverage) to a three-level confidence
//! using fixed thresholds. The classification is total: every input tuple
//! maps to exactly one level.
//!
//! When outliers were excluded from a feature's statistics, the classifier
//! is fed the robust (outlier-excluded) dispersion rather than the raw one,
//! so a single wild entry lowers reliability through the outlier channel
//! without permanently masking an otherwise tight cluster.

use serde::{Deserialize, Serialize};

use super::DataCoverage;

/// Thresholds for confidence classification.
pub mod thresholds {
    /// Minimum tracked entries required for HIGH confidence.
    pub const HIGH_MIN_ENTRIES: usize = 5;

    /// HIGH additionally requires std_dev below this fraction of the mean.
    pub const HIGH_MAX_DISPERSION_RATIO: f64 = 0.2;

    /// Minimum tracked entries for MEDIUM confidence.
    pub const MEDIUM_MIN_ENTRIES: usize = 2;
}

/// Qualitative reliability of a feature's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "HIGH",
            Confidence::Medium => "MEDIUM",
            Confidence::Low => "LOW",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify the reliability of a statistics bundle.
///
/// - Seed coverage or a single entry is always LOW.
/// - Five or more tracked entries with std_dev below 20% of the mean is HIGH.
/// - Two to four tracked entries is MEDIUM.
/// - Five or more tracked entries with higher dispersion is MEDIUM; the
///   dispersion gate always applies before awarding HIGH.
pub fn classify_confidence(
    entry_count: usize,
    std_dev: f64,
    mean: f64,
    coverage: DataCoverage,
) -> Confidence {
    if coverage == DataCoverage::Seed || entry_count <= 1 {
        return Confidence::Low;
    }

    if entry_count >= thresholds::HIGH_MIN_ENTRIES
        && mean > 0.0
        && std_dev < thresholds::HIGH_MAX_DISPERSION_RATIO * mean
    {
        return Confidence::High;
    }

    // Everything tracked with at least MEDIUM_MIN_ENTRIES lands here,
    // including large-but-noisy samples.
    Confidence::Medium
}
