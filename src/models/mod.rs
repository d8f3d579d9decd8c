//! Data models for Ballpark entities.
//!
//! This module defines the core data structures:
//! - `Feature` - Catalog entries with seed hours, synonyms, and seed history
//! - `TrackedTimeEntry` - A single observation of actual effort
//! - `FeatureStatistics` - Derived per-feature statistics bundle
//! - `EstimateLineItem` / `ProjectEstimate` - Project-level estimation output
//!
//! The computation leaves live in submodules: `stats` (closed-form
//! statistics), `outliers` (threshold flagging + robust recompute),
//! `confidence` (HIGH/MEDIUM/LOW classification), and `overlap`
//! (keyword-based scope-overlap warnings).

pub mod confidence;
pub mod outliers;
pub mod overlap;
pub mod stats;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};
use self::confidence::Confidence;
use self::overlap::OverlapWarning;

/// Team affinity of a feature or time entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Frontend,
    Backend,
    /// Work that spans both teams; estimate hours are split evenly.
    Both,
}

impl Team {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "frontend" | "fe" => Some(Team::Frontend),
            "backend" | "be" => Some(Team::Backend),
            "both" => Some(Team::Both),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Frontend => "frontend",
            Team::Backend => "backend",
            Team::Both => "both",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Experience level applied project-wide when computing an estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Junior,
    #[default]
    Mid,
    Senior,
}

impl ExperienceLevel {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "junior" | "jr" => Some(ExperienceLevel::Junior),
            "mid" | "medium" => Some(ExperienceLevel::Mid),
            "senior" | "sr" => Some(ExperienceLevel::Senior),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::Mid => "mid",
            ExperienceLevel::Senior => "senior",
        }
    }
}

/// Central-tendency style used to pick a line item's hours from tracked data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationStyle {
    Mean,
    #[default]
    Median,
    P80,
}

impl EstimationStyle {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mean" => Some(EstimationStyle::Mean),
            "median" => Some(EstimationStyle::Median),
            "p80" => Some(EstimationStyle::P80),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EstimationStyle::Mean => "mean",
            EstimationStyle::Median => "median",
            EstimationStyle::P80 => "p80",
        }
    }
}

impl fmt::Display for EstimationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which statistic produced a line item's hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    TrackedMean,
    TrackedMedian,
    TrackedP80,
    Seed,
}

impl Basis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Basis::TrackedMean => "tracked_mean",
            Basis::TrackedMedian => "tracked_median",
            Basis::TrackedP80 => "tracked_p80",
            Basis::Seed => "seed",
        }
    }
}

/// Whether a statistics bundle came from tracked observations or seed hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCoverage {
    Tracked,
    Seed,
}

/// One prior seed-hours value, recorded before a seed update is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedTimeChange {
    /// Seed hours before the update
    pub previous_hours: f64,

    /// Seed hours after the update
    pub new_hours: f64,

    /// When the update was applied
    pub changed_at: DateTime<Utc>,
}

/// A catalog feature tracked by Ballpark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// Unique identifier (e.g., "bpf-a1b2")
    pub id: String,

    /// Entity type marker
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Canonical display name
    pub name: String,

    /// Team affinity
    pub team: Team,

    /// Free grouping label (e.g., "core", "integrations")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Initial hours estimate, used only when no tracked data exists
    pub seed_hours: f64,

    /// Alternate names that resolve to this feature
    #[serde(default)]
    pub synonyms: Vec<String>,

    /// Free-text notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Append-only history of prior seed-hours values
    #[serde(default)]
    pub seed_history: Vec<SeedTimeChange>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    /// Create a new feature with the given ID, name, team, and seed hours.
    pub fn new(id: String, name: String, team: Team, seed_hours: f64) -> Self {
        let now = Utc::now();
        Self {
            id,
            entity_type: "feature".to_string(),
            name,
            team,
            category: None,
            seed_hours,
            synonyms: Vec::new(),
            notes: None,
            seed_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single observation of actual effort logged against a feature label.
///
/// The label is free text and is only resolved to a catalog feature at
/// aggregation time, so imports never fail on unknown features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedTimeEntry {
    /// Unique identifier (e.g., "bpt-a1b2")
    pub id: String,

    /// Entity type marker
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Team that logged the time
    pub team: Team,

    /// Member name or identifier
    pub member: String,

    /// Free-text feature label (not yet resolved to a catalog id)
    pub feature_label: String,

    /// Hours spent; must be a positive finite number
    pub hours: f64,

    /// Optional process/category tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Optional date the work happened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl TrackedTimeEntry {
    /// Create a new entry with the given ID, team, member, label, and hours.
    pub fn new(id: String, team: Team, member: String, feature_label: String, hours: f64) -> Self {
        Self {
            id,
            entity_type: "time".to_string(),
            team,
            member,
            feature_label,
            hours,
            category: None,
            date: None,
            created_at: Utc::now(),
        }
    }

    /// Validate entry fields before ingestion.
    ///
    /// Rejects empty member/label and non-positive or non-finite hours;
    /// bad values are never clamped to a default.
    pub fn validate(&self) -> Result<()> {
        if self.member.trim().is_empty() {
            return Err(Error::Validation("member must not be empty".to_string()));
        }
        if self.feature_label.trim().is_empty() {
            return Err(Error::Validation("feature must not be empty".to_string()));
        }
        if !self.hours.is_finite() || self.hours <= 0.0 {
            return Err(Error::Validation(format!(
                "hours must be a positive finite number, got {}",
                self.hours
            )));
        }
        Ok(())
    }
}

/// An entry flagged as an outlier during statistics computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFlag {
    /// ID of the flagged entry
    pub entry_id: String,

    /// The raw hours value
    pub hours: f64,

    /// The threshold it exceeded (multiplier × median)
    pub threshold: f64,
}

/// Statistics recomputed after excluding flagged outlier entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustStatistics {
    pub mean: f64,
    pub median: f64,
    pub percentile: f64,
    pub std_dev: f64,
}

/// Per-feature statistics bundle, recomputed on demand and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStatistics {
    /// Number of tracked entries behind the numbers (0 for seed coverage)
    pub count: usize,

    pub mean: f64,
    pub median: f64,

    /// Value at the configured target percentile (e.g., P80)
    pub percentile: f64,

    /// Population standard deviation
    pub std_dev: f64,

    /// Whether the numbers come from tracked entries or seed hours
    pub coverage: DataCoverage,

    /// Entries flagged as outliers, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outliers: Vec<OutlierFlag>,

    /// Statistics excluding flagged outliers, when any were flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robust: Option<RobustStatistics>,
}

/// One feature's contribution to a project estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateLineItem {
    /// Feature name as requested by the caller
    pub feature_name: String,

    /// Team affinity (defaults to backend for unknown features)
    pub team: Team,

    /// Estimated hours after style selection and experience multiplier
    pub hours: f64,

    /// Which statistic produced the hours
    pub basis: Basis,

    /// Reliability of the underlying data
    pub confidence: Confidence,

    /// Category inherited from the catalog feature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// True for names with no catalog match
    #[serde(default)]
    pub is_new_feature: bool,
}

/// A computed project-level estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEstimate {
    /// Unique identifier (e.g., "bpe-a1b2")
    pub id: String,

    /// Entity type marker
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Line items in the order features were requested
    pub line_items: Vec<EstimateLineItem>,

    /// Frontend-team hours: frontend lines plus half of each "both" line
    pub frontend_hours: f64,

    /// Backend-team hours: backend lines plus half of each "both" line
    pub backend_hours: f64,

    /// Sum of all line-item hours; never includes buffer
    pub grand_total_hours: f64,

    /// Buffer hours, kept separate from the grand total
    pub buffer_hours: f64,

    /// Heuristic scope-overlap warnings between selected features
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<OverlapWarning>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Normalize a feature name or label for matching.
///
/// Trims, lowercases, and collapses internal whitespace so labels differing
/// only in case or spacing group together.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label_trims_and_lowercases() {
        assert_eq!(normalize_label("  User Auth  "), "user auth");
        assert_eq!(normalize_label("CRUD"), "crud");
    }

    #[test]
    fn test_normalize_label_collapses_whitespace() {
        assert_eq!(normalize_label("user\t  auth\n flow"), "user auth flow");
        assert_eq!(normalize_label(""), "");
    }

    #[test]
    fn test_team_parse() {
        assert_eq!(Team::parse("Frontend"), Some(Team::Frontend));
        assert_eq!(Team::parse("BE"), Some(Team::Backend));
        assert_eq!(Team::parse("both"), Some(Team::Both));
        assert_eq!(Team::parse("ops"), None);
    }

    #[test]
    fn test_style_parse_roundtrip() {
        for style in [
            EstimationStyle::Mean,
            EstimationStyle::Median,
            EstimationStyle::P80,
        ] {
            assert_eq!(EstimationStyle::parse(style.as_str()), Some(style));
        }
        assert_eq!(EstimationStyle::parse("p99"), None);
    }

    #[test]
    fn test_entry_validate_rejects_bad_hours() {
        let mut entry = TrackedTimeEntry::new(
            "bpt-0001".to_string(),
            Team::Backend,
            "sam".to_string(),
            "crud".to_string(),
            4.0,
        );
        assert!(entry.validate().is_ok());

        entry.hours = 0.0;
        assert!(entry.validate().is_err());
        entry.hours = -2.5;
        assert!(entry.validate().is_err());
        entry.hours = f64::NAN;
        assert!(entry.validate().is_err());
        entry.hours = f64::INFINITY;
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_entry_validate_rejects_empty_fields() {
        let entry = TrackedTimeEntry::new(
            "bpt-0001".to_string(),
            Team::Frontend,
            "  ".to_string(),
            "crud".to_string(),
            4.0,
        );
        let err = entry.validate().unwrap_err();
        assert!(err.to_string().contains("member"));
    }

    #[test]
    fn test_feature_serde_roundtrip() {
        let mut feature = Feature::new(
            "bpf-a1b2".to_string(),
            "User Auth".to_string(),
            Team::Both,
            6.0,
        );
        feature.synonyms.push("login".to_string());

        let json = serde_json::to_string(&feature).unwrap();
        assert!(json.contains("\"type\":\"feature\""));
        assert!(json.contains("\"both\""));

        let back: Feature = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "User Auth");
        assert_eq!(back.team, Team::Both);
        assert_eq!(back.synonyms, vec!["login".to_string()]);
    }
}
