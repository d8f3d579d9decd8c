//! Outlier flagging and robust statistics.
//!
//! A tracked sample is flagged when it exceeds a configurable multiple of
//! the group median. Robust statistics recompute the `stats` set with
//! flagged samples excluded, so one wild entry can't drag the estimate.

use super::stats;
use crate::models::RobustStatistics;
use crate::Result;

/// Indices of values exceeding `threshold × median(values)`.
///
/// A zero (or empty) median flags nothing; every positive value would
/// exceed a zero baseline.
pub fn detect_outliers(values: &[f64], threshold: f64) -> Vec<usize> {
    let Ok(med) = stats::median(values) else {
        return Vec::new();
    };
    if med <= 0.0 {
        return Vec::new();
    }

    let cutoff = threshold * med;
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > cutoff)
        .map(|(i, _)| i)
        .collect()
}

/// Recompute mean/median/percentile/std_dev excluding the given indices.
///
/// If exclusion would empty the set, falls back to statistics over the full
/// set; this function never surfaces an empty-input error.
pub fn robust_statistics(
    values: &[f64],
    excluded: &[usize],
    target_percentile: f64,
) -> Result<RobustStatistics> {
    let kept: Vec<f64> = values
        .iter()
        .enumerate()
        .filter(|(i, _)| !excluded.contains(i))
        .map(|(_, v)| *v)
        .collect();

    let sample = if kept.is_empty() { values } else { &kept[..] };

    Ok(RobustStatistics {
        mean: stats::mean(sample)?,
        median: stats::median(sample)?,
        percentile: stats::percentile(sample, target_percentile)?,
        std_dev: stats::std_dev(sample)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_outliers_flags_above_threshold() {
        // median 4.0, threshold 3.0 -> cutoff 12.0; only 20.0 exceeds it
        let values = [3.5, 4.0, 4.5, 4.0, 20.0];
        assert_eq!(detect_outliers(&values, 3.0), vec![4]);
    }

    #[test]
    fn test_detect_outliers_boundary_not_flagged() {
        // exactly threshold × median is not an outlier (strict >)
        let values = [4.0, 4.0, 12.0];
        assert_eq!(detect_outliers(&values, 3.0), Vec::<usize>::new());
    }

    #[test]
    fn test_detect_outliers_zero_median_flags_nothing() {
        let values = [0.0, 0.0, 0.0, 50.0];
        assert_eq!(detect_outliers(&values, 3.0), Vec::<usize>::new());
    }

    #[test]
    fn test_detect_outliers_empty_input() {
        assert_eq!(detect_outliers(&[], 3.0), Vec::<usize>::new());
    }

    #[test]
    fn test_robust_statistics_excludes_flagged() {
        let values = [3.5, 4.0, 4.5, 4.0, 20.0];
        let robust = robust_statistics(&values, &[4], 80.0).unwrap();
        assert_eq!(robust.median, 4.0);
        assert_eq!(robust.mean, 4.0);
        assert!(robust.std_dev < 1.0);
    }

    #[test]
    fn test_robust_statistics_all_excluded_falls_back() {
        let values = [4.0, 5.0];
        let robust = robust_statistics(&values, &[0, 1], 80.0).unwrap();
        // falls back to the un-excluded statistics instead of erroring
        assert_eq!(robust.mean, 4.5);
    }

    #[test]
    fn test_robust_statistics_no_exclusions_matches_raw() {
        let values = [2.0, 4.0, 6.0];
        let robust = robust_statistics(&values, &[], 50.0).unwrap();
        assert_eq!(robust.mean, 4.0);
        assert_eq!(robust.median, 4.0);
        assert_eq!(robust.percentile, 4.0);
    }
}
