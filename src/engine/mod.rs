//! The estimation engine: tracked-time aggregation and project estimates.
//!
//! Everything here is pure computation over borrowed data plus a
//! [`ConfigSnapshot`] taken at the start of the request, so concurrent
//! catalog or config changes never bleed into an in-flight estimate.
//!
//! Flow per request: collect feature names, resolve each against the
//! catalog, compute per-feature statistics, select the basis statistic per
//! the active style, apply the experience multiplier, detect scope
//! overlaps, and aggregate totals.

use chrono::Utc;

use crate::catalog;
use crate::config::ConfigSnapshot;
use crate::models::confidence::{classify_confidence, Confidence};
use crate::models::{
    normalize_label, outliers, overlap, stats, Basis, DataCoverage, EstimateLineItem,
    EstimationStyle, ExperienceLevel, Feature, FeatureStatistics, OutlierFlag, ProjectEstimate,
    RobustStatistics, Team, TrackedTimeEntry,
};
use crate::storage::generate_id;
use crate::{Error, Result};

/// A project-estimate request.
#[derive(Debug, Clone, Default)]
pub struct EstimateRequest {
    /// Feature names, free text, in display order
    pub feature_names: Vec<String>,

    /// Optional project-wide experience level
    pub experience: Option<ExperienceLevel>,

    /// Hours to assume for names with no catalog match (defaults to 0)
    pub seed_default: Option<f64>,
}

/// Compute the statistics bundle for one catalog feature.
///
/// Entries are grouped by normalized label against the feature's name and
/// synonyms, so labels differing only in case or whitespace land in the
/// same group. An empty group falls back to seed coverage instead of
/// surfacing an empty-input error.
pub fn statistics_for(
    feature: &Feature,
    entries: &[TrackedTimeEntry],
    snapshot: &ConfigSnapshot,
) -> Result<FeatureStatistics> {
    let mut labels = vec![normalize_label(&feature.name)];
    labels.extend(feature.synonyms.iter().map(|s| normalize_label(s)));

    let group: Vec<&TrackedTimeEntry> = entries
        .iter()
        .filter(|e| labels.contains(&normalize_label(&e.feature_label)))
        .collect();

    if group.is_empty() {
        // The valid zero-tracked-data case: seed hours stand in for every
        // central statistic and dispersion is zero by construction.
        return Ok(FeatureStatistics {
            count: 0,
            mean: feature.seed_hours,
            median: feature.seed_hours,
            percentile: feature.seed_hours,
            std_dev: 0.0,
            coverage: DataCoverage::Seed,
            outliers: Vec::new(),
            robust: None,
        });
    }

    let config = &snapshot.config;
    let values: Vec<f64> = group.iter().map(|e| e.hours).collect();

    let mean = stats::mean(&values)?;
    let median = stats::median(&values)?;
    let percentile = stats::percentile(&values, config.target_percentile)?;
    let std_dev = stats::std_dev(&values)?;

    let flagged = outliers::detect_outliers(&values, config.outlier_threshold);
    let outlier_flags: Vec<OutlierFlag> = flagged
        .iter()
        .map(|&i| OutlierFlag {
            entry_id: group[i].id.clone(),
            hours: group[i].hours,
            threshold: config.outlier_threshold * median,
        })
        .collect();

    let robust = if flagged.is_empty() {
        None
    } else {
        Some(outliers::robust_statistics(
            &values,
            &flagged,
            config.target_percentile,
        )?)
    };

    Ok(FeatureStatistics {
        count: values.len(),
        mean,
        median,
        percentile,
        std_dev,
        coverage: DataCoverage::Tracked,
        outliers: outlier_flags,
        robust,
    })
}

/// Classify confidence for a statistics bundle under the active config.
///
/// When outliers were excluded, classification runs on the effective
/// sample: the outlier-excluded count and dispersion. A count below the
/// configured minimum tracked points is LOW regardless of dispersion.
pub fn confidence_for(statistics: &FeatureStatistics, snapshot: &ConfigSnapshot) -> Confidence {
    let (count, std_dev, mean) = match &statistics.robust {
        Some(robust) => (
            statistics.count.saturating_sub(statistics.outliers.len()),
            robust.std_dev,
            robust.mean,
        ),
        None => (statistics.count, statistics.std_dev, statistics.mean),
    };

    if statistics.coverage == DataCoverage::Tracked && count < snapshot.config.min_tracked_points {
        return Confidence::Low;
    }

    classify_confidence(count, std_dev, mean, statistics.coverage)
}

/// The statistic the active style selects, from the robust set when
/// outliers were excluded and the raw set otherwise.
fn select_hours(statistics: &FeatureStatistics, style: EstimationStyle) -> (f64, Basis) {
    if statistics.coverage == DataCoverage::Seed {
        return (statistics.mean, Basis::Seed);
    }

    let (mean, median, percentile) = match &statistics.robust {
        Some(RobustStatistics {
            mean,
            median,
            percentile,
            ..
        }) => (*mean, *median, *percentile),
        None => (statistics.mean, statistics.median, statistics.percentile),
    };

    match style {
        EstimationStyle::Mean => (mean, Basis::TrackedMean),
        EstimationStyle::Median => (median, Basis::TrackedMedian),
        EstimationStyle::P80 => (percentile, Basis::TrackedP80),
    }
}

/// Compute a project-level estimate.
///
/// Unresolved names become line items flagged `is_new_feature` with the
/// caller-supplied seed default (or zero); they are data, not errors. An
/// empty name list yields an empty estimate.
pub fn estimate_project(
    features: &[Feature],
    entries: &[TrackedTimeEntry],
    request: &EstimateRequest,
    snapshot: &ConfigSnapshot,
) -> Result<ProjectEstimate> {
    let config = &snapshot.config;
    let multiplier = request
        .experience
        .map(|level| config.multiplier_for(level))
        .unwrap_or(1.0);

    let mut line_items = Vec::with_capacity(request.feature_names.len());
    for name in &request.feature_names {
        let line = match catalog::find_by_name_or_synonym(features, name) {
            Some(feature) => {
                let statistics = statistics_for(feature, entries, snapshot)?;
                let confidence = confidence_for(&statistics, snapshot);
                let (hours, basis) = select_hours(&statistics, config.style);
                EstimateLineItem {
                    feature_name: name.clone(),
                    team: feature.team,
                    hours: hours * multiplier,
                    basis,
                    confidence,
                    category: feature.category.clone(),
                    is_new_feature: false,
                }
            }
            None => EstimateLineItem {
                feature_name: name.clone(),
                team: Team::Backend,
                hours: request.seed_default.unwrap_or(0.0) * multiplier,
                basis: Basis::Seed,
                confidence: Confidence::Low,
                category: None,
                is_new_feature: true,
            },
        };
        line_items.push(line);
    }

    let warnings = overlap::detect_overlaps(
        &line_items
            .iter()
            .map(|l| l.feature_name.clone())
            .collect::<Vec<_>>(),
        &config.overlap_vocabulary,
    );

    let mut frontend_hours = 0.0;
    let mut backend_hours = 0.0;
    let mut grand_total_hours = 0.0;
    for line in &line_items {
        grand_total_hours += line.hours;
        match line.team {
            Team::Frontend => frontend_hours += line.hours,
            Team::Backend => backend_hours += line.hours,
            Team::Both => {
                frontend_hours += line.hours / 2.0;
                backend_hours += line.hours / 2.0;
            }
        }
    }

    let buffer_hours = grand_total_hours * config.buffer_percent / 100.0;
    if buffer_hours < 0.0 || !buffer_hours.is_finite() {
        return Err(Error::Computation(format!(
            "buffer computed as {} from percent {}",
            buffer_hours, config.buffer_percent
        )));
    }

    Ok(ProjectEstimate {
        id: generate_id("bpe", &request.feature_names.join(",")),
        entity_type: "estimate".to_string(),
        line_items,
        frontend_hours,
        backend_hours,
        grand_total_hours,
        buffer_hours,
        warnings,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStore, EstimationConfig};

    fn snapshot() -> ConfigSnapshot {
        ConfigStore::new(EstimationConfig::default()).snapshot()
    }

    fn feature(name: &str, team: Team, seed: f64) -> Feature {
        Feature::new(format!("bpf-{}", &name[..2]), name.to_string(), team, seed)
    }

    fn entry(id: &str, label: &str, hours: f64) -> TrackedTimeEntry {
        TrackedTimeEntry::new(
            id.to_string(),
            Team::Backend,
            "sam".to_string(),
            label.to_string(),
            hours,
        )
    }

    fn crud_entries() -> Vec<TrackedTimeEntry> {
        [3.5, 4.0, 4.5, 4.0, 20.0]
            .iter()
            .enumerate()
            .map(|(i, h)| entry(&format!("bpt-000{}", i), "crud", *h))
            .collect()
    }

    #[test]
    fn test_statistics_for_seed_fallback() {
        let f = feature("websocket", Team::Backend, 12.0);
        let s = statistics_for(&f, &[], &snapshot()).unwrap();
        assert_eq!(s.coverage, DataCoverage::Seed);
        assert_eq!(s.count, 0);
        assert_eq!(s.mean, 12.0);
        assert_eq!(s.median, 12.0);
        assert_eq!(s.std_dev, 0.0);
        assert!(s.robust.is_none());
    }

    #[test]
    fn test_statistics_for_groups_by_normalized_label() {
        let f = feature("User Auth", Team::Frontend, 4.0);
        let entries = vec![
            entry("bpt-0001", "user auth", 3.0),
            entry("bpt-0002", "  USER  AUTH ", 5.0),
            entry("bpt-0003", "payments", 9.0),
        ];
        let s = statistics_for(&f, &entries, &snapshot()).unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, 4.0);
        assert_eq!(s.coverage, DataCoverage::Tracked);
    }

    #[test]
    fn test_statistics_for_matches_synonyms() {
        let mut f = feature("User Auth", Team::Frontend, 4.0);
        f.synonyms.push("login".to_string());
        let entries = vec![entry("bpt-0001", "Login", 6.0)];
        let s = statistics_for(&f, &entries, &snapshot()).unwrap();
        assert_eq!(s.count, 1);
        assert_eq!(s.mean, 6.0);
    }

    #[test]
    fn test_statistics_for_flags_outlier_and_recomputes() {
        let f = feature("crud", Team::Backend, 4.0);
        let s = statistics_for(&f, &crud_entries(), &snapshot()).unwrap();

        assert_eq!(s.count, 5);
        assert_eq!(s.median, 4.0);
        // 20.0 > 3.0 × 4.0
        assert_eq!(s.outliers.len(), 1);
        assert_eq!(s.outliers[0].entry_id, "bpt-0004");
        assert_eq!(s.outliers[0].threshold, 12.0);

        let robust = s.robust.as_ref().unwrap();
        assert_eq!(robust.median, 4.0);
        assert_eq!(robust.mean, 4.0);
        assert!(robust.std_dev < s.std_dev);
    }

    #[test]
    fn test_confidence_uses_effective_sample() {
        // 5 raw entries, one excluded as an outlier: the effective sample
        // of 4 lands in the MEDIUM band even though the kept cluster is
        // tight enough for the dispersion gate.
        let f = feature("crud", Team::Backend, 4.0);
        let snap = snapshot();
        let s = statistics_for(&f, &crud_entries(), &snap).unwrap();
        assert_eq!(confidence_for(&s, &snap), Confidence::Medium);
    }

    #[test]
    fn test_confidence_high_for_clean_large_sample() {
        let f = feature("crud", Team::Backend, 4.0);
        let entries: Vec<TrackedTimeEntry> = [3.8, 4.0, 4.1, 4.0, 4.2]
            .iter()
            .enumerate()
            .map(|(i, h)| entry(&format!("bpt-100{}", i), "crud", *h))
            .collect();
        let snap = snapshot();
        let s = statistics_for(&f, &entries, &snap).unwrap();
        assert!(s.outliers.is_empty());
        assert_eq!(confidence_for(&s, &snap), Confidence::High);
    }

    #[test]
    fn test_confidence_seed_is_low() {
        let f = feature("websocket", Team::Backend, 12.0);
        let snap = snapshot();
        let s = statistics_for(&f, &[], &snap).unwrap();
        assert_eq!(confidence_for(&s, &snap), Confidence::Low);
    }

    #[test]
    fn test_estimate_empty_name_list_is_empty_estimate() {
        let request = EstimateRequest::default();
        let estimate = estimate_project(&[], &[], &request, &snapshot()).unwrap();
        assert!(estimate.line_items.is_empty());
        assert_eq!(estimate.grand_total_hours, 0.0);
        assert_eq!(estimate.buffer_hours, 0.0);
        assert!(estimate.warnings.is_empty());
    }

    #[test]
    fn test_estimate_end_to_end_with_unknown_feature() {
        let features = vec![
            feature("CRUD", Team::Backend, 4.0),
            feature("websocket", Team::Backend, 12.0),
        ];
        let request = EstimateRequest {
            feature_names: vec![
                "CRUD".to_string(),
                "websocket".to_string(),
                "unknown-feature".to_string(),
            ],
            experience: None,
            seed_default: None,
        };
        let estimate = estimate_project(&features, &crud_entries(), &request, &snapshot()).unwrap();

        assert_eq!(estimate.line_items.len(), 3);

        // CRUD: tracked, median style, robust median after outlier exclusion
        let crud = &estimate.line_items[0];
        assert_eq!(crud.basis, Basis::TrackedMedian);
        assert_eq!(crud.hours, 4.0);
        assert!(!crud.is_new_feature);

        // websocket: no tracked data, seed fallback
        let ws = &estimate.line_items[1];
        assert_eq!(ws.basis, Basis::Seed);
        assert_eq!(ws.hours, 12.0);
        assert_eq!(ws.confidence, Confidence::Low);

        // unknown: new feature at zero hours
        let unknown = &estimate.line_items[2];
        assert!(unknown.is_new_feature);
        assert_eq!(unknown.basis, Basis::Seed);
        assert_eq!(unknown.hours, 0.0);

        let sum: f64 = estimate.line_items.iter().map(|l| l.hours).sum();
        assert_eq!(estimate.grand_total_hours, sum);
    }

    #[test]
    fn test_estimate_team_split_for_both() {
        let features = vec![
            feature("CRUD", Team::Backend, 4.0),
            feature("design system", Team::Frontend, 10.0),
            feature("User Auth", Team::Both, 6.0),
        ];
        let request = EstimateRequest {
            feature_names: vec![
                "CRUD".to_string(),
                "design system".to_string(),
                "User Auth".to_string(),
            ],
            experience: None,
            seed_default: None,
        };
        let estimate = estimate_project(&features, &[], &request, &snapshot()).unwrap();

        assert_eq!(estimate.backend_hours, 4.0 + 3.0);
        assert_eq!(estimate.frontend_hours, 10.0 + 3.0);
        assert_eq!(estimate.grand_total_hours, 20.0);
        assert_eq!(
            estimate.frontend_hours + estimate.backend_hours,
            estimate.grand_total_hours
        );
    }

    #[test]
    fn test_estimate_buffer_separate_from_grand_total() {
        let features = vec![feature("CRUD", Team::Backend, 4.0)];
        let request = EstimateRequest {
            feature_names: vec!["CRUD".to_string()],
            experience: None,
            seed_default: None,
        };

        let store = ConfigStore::new(EstimationConfig::default());
        let before = estimate_project(&features, &[], &request, &store.snapshot()).unwrap();
        assert_eq!(before.buffer_hours, 0.0);

        store.set_buffer_percent(25.0).unwrap();
        let after = estimate_project(&features, &[], &request, &store.snapshot()).unwrap();

        // grand total unchanged; only the separate buffer moved
        assert_eq!(after.grand_total_hours, before.grand_total_hours);
        assert_eq!(after.buffer_hours, 1.0);
    }

    #[test]
    fn test_estimate_experience_multiplier_applies_to_all_lines() {
        let features = vec![feature("CRUD", Team::Backend, 4.0)];
        let request = EstimateRequest {
            feature_names: vec!["CRUD".to_string(), "unknown".to_string()],
            experience: Some(ExperienceLevel::Junior),
            seed_default: Some(2.0),
        };
        let estimate = estimate_project(&features, &[], &request, &snapshot()).unwrap();

        assert_eq!(estimate.line_items[0].hours, 4.0 * 1.5);
        assert_eq!(estimate.line_items[1].hours, 2.0 * 1.5);
    }

    #[test]
    fn test_estimate_style_change_recomputes_without_stale_reuse() {
        let features = vec![feature("crud", Team::Backend, 4.0)];
        let entries: Vec<TrackedTimeEntry> = [2.0, 3.0, 4.0, 5.0, 6.0]
            .iter()
            .enumerate()
            .map(|(i, h)| entry(&format!("bpt-200{}", i), "crud", *h))
            .collect();
        let request = EstimateRequest {
            feature_names: vec!["crud".to_string()],
            experience: None,
            seed_default: None,
        };

        let store = ConfigStore::new(EstimationConfig::default());
        let median_based = estimate_project(&features, &entries, &request, &store.snapshot())
            .unwrap();
        assert_eq!(median_based.line_items[0].basis, Basis::TrackedMedian);
        assert_eq!(median_based.line_items[0].hours, 4.0);

        store.set_estimation_style(EstimationStyle::P80).unwrap();
        let p80_based =
            estimate_project(&features, &entries, &request, &store.snapshot()).unwrap();
        assert_eq!(p80_based.line_items[0].basis, Basis::TrackedP80);
        assert!(p80_based.line_items[0].hours >= median_based.line_items[0].hours);
    }

    #[test]
    fn test_estimate_overlap_warnings() {
        let features = vec![
            feature("user login", Team::Both, 4.0),
            feature("login audit", Team::Backend, 2.0),
        ];
        let request = EstimateRequest {
            feature_names: vec!["user login".to_string(), "login audit".to_string()],
            experience: None,
            seed_default: None,
        };
        let estimate = estimate_project(&features, &[], &request, &snapshot()).unwrap();

        assert_eq!(estimate.warnings.len(), 1);
        assert_eq!(estimate.warnings[0].keyword, "login");
        assert_eq!(estimate.warnings[0].features.len(), 2);
    }
}
