//! KDL schema definition for config.kdl.
//!
//! This module provides:
//! - The `EstimationConfig` struct with built-in defaults
//! - Serialization/deserialization to/from KDL format
//! - Validation functions
//! - Key-based get/set used by `bp config`

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

use crate::models::overlap;
use crate::models::EstimationStyle;

/// Process-wide estimation settings stored in config.kdl.
///
/// These settings are safe to sync across machines.
///
/// # KDL Schema
///
/// ```kdl
/// estimation-style "median"  // or "mean", "p80"
/// working-hours-per-day 8.0
/// multiplier-junior 1.5
/// multiplier-mid 1.0
/// multiplier-senior 0.8
/// buffer-percent 15.0
/// outlier-threshold 3.0
/// min-tracked-points 2
/// target-percentile 80.0
/// overlap-vocabulary "auth" "login" "payment"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationConfig {
    /// Central-tendency style used for tracked-data line items
    pub style: EstimationStyle,

    /// Working hours per day, used by day-count rendering
    pub working_hours_per_day: f64,

    /// Hour multiplier for a junior-level team
    pub multiplier_junior: f64,

    /// Hour multiplier for a mid-level team
    pub multiplier_mid: f64,

    /// Hour multiplier for a senior-level team
    pub multiplier_senior: f64,

    /// Buffer percentage applied on top of the base total (kept separate)
    pub buffer_percent: f64,

    /// Outlier flagging multiplier: values above threshold × median are flagged
    pub outlier_threshold: f64,

    /// Tracked entry count below which confidence can never exceed MEDIUM
    pub min_tracked_points: usize,

    /// Percentile reported in statistics and used by the p80 style
    pub target_percentile: f64,

    /// Keyword vocabulary for scope-overlap warnings
    pub overlap_vocabulary: Vec<String>,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            style: EstimationStyle::Median,
            working_hours_per_day: 8.0,
            multiplier_junior: 1.5,
            multiplier_mid: 1.0,
            multiplier_senior: 0.8,
            buffer_percent: 0.0,
            outlier_threshold: 3.0,
            min_tracked_points: 2,
            target_percentile: 80.0,
            overlap_vocabulary: overlap::default_vocabulary(),
        }
    }
}

impl EstimationConfig {
    /// Create a config with built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiplier for the given experience level.
    pub fn multiplier_for(&self, level: crate::models::ExperienceLevel) -> f64 {
        use crate::models::ExperienceLevel;
        match level {
            ExperienceLevel::Junior => self.multiplier_junior,
            ExperienceLevel::Mid => self.multiplier_mid,
            ExperienceLevel::Senior => self.multiplier_senior,
        }
    }

    /// Validate the config values.
    ///
    /// Returns an error message naming the offending field if any value
    /// is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !self.working_hours_per_day.is_finite() || self.working_hours_per_day <= 0.0 {
            return Err(format!(
                "working-hours-per-day must be positive, got {}",
                self.working_hours_per_day
            ));
        }
        for (name, value) in [
            ("multiplier-junior", self.multiplier_junior),
            ("multiplier-mid", self.multiplier_mid),
            ("multiplier-senior", self.multiplier_senior),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be positive, got {}", name, value));
            }
        }
        if !self.buffer_percent.is_finite() || self.buffer_percent < 0.0 {
            return Err(format!(
                "buffer-percent must be >= 0, got {}",
                self.buffer_percent
            ));
        }
        if !self.outlier_threshold.is_finite() || self.outlier_threshold <= 0.0 {
            return Err(format!(
                "outlier-threshold must be positive, got {}",
                self.outlier_threshold
            ));
        }
        if !(0.0..=100.0).contains(&self.target_percentile) {
            return Err(format!(
                "target-percentile must be within 0..=100, got {}",
                self.target_percentile
            ));
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes and values that fail to parse are skipped field-wise;
    /// missing fields keep their defaults.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::default();

        if let Some(s) = get_string(doc, "estimation-style") {
            if let Some(style) = EstimationStyle::parse(&s) {
                config.style = style;
            }
        }

        if let Some(v) = get_float(doc, "working-hours-per-day") {
            config.working_hours_per_day = v;
        }
        if let Some(v) = get_float(doc, "multiplier-junior") {
            config.multiplier_junior = v;
        }
        if let Some(v) = get_float(doc, "multiplier-mid") {
            config.multiplier_mid = v;
        }
        if let Some(v) = get_float(doc, "multiplier-senior") {
            config.multiplier_senior = v;
        }
        if let Some(v) = get_float(doc, "buffer-percent") {
            config.buffer_percent = v;
        }
        if let Some(v) = get_float(doc, "outlier-threshold") {
            config.outlier_threshold = v;
        }
        if let Some(v) = get_float(doc, "target-percentile") {
            config.target_percentile = v;
        }

        if let Some(node) = doc.get("min-tracked-points") {
            if let Some(entry) = node.entries().first() {
                if let Some(i) = entry.value().as_integer() {
                    if i >= 0 {
                        config.min_tracked_points = i as usize;
                    }
                }
            }
        }

        if let Some(node) = doc.get("overlap-vocabulary") {
            let words: Vec<String> = node
                .entries()
                .iter()
                .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
                .collect();
            if !words.is_empty() {
                config.overlap_vocabulary = words;
            }
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        let mut node = KdlNode::new("estimation-style");
        node.push(KdlEntry::new(KdlValue::String(
            self.style.as_str().to_string(),
        )));
        doc.nodes_mut().push(node);

        for (name, value) in [
            ("working-hours-per-day", self.working_hours_per_day),
            ("multiplier-junior", self.multiplier_junior),
            ("multiplier-mid", self.multiplier_mid),
            ("multiplier-senior", self.multiplier_senior),
            ("buffer-percent", self.buffer_percent),
            ("outlier-threshold", self.outlier_threshold),
            ("target-percentile", self.target_percentile),
        ] {
            let mut node = KdlNode::new(name);
            node.push(KdlEntry::new(KdlValue::Float(value)));
            doc.nodes_mut().push(node);
        }

        let mut node = KdlNode::new("min-tracked-points");
        node.push(KdlEntry::new(KdlValue::Integer(
            self.min_tracked_points as i128,
        )));
        doc.nodes_mut().push(node);

        let mut node = KdlNode::new("overlap-vocabulary");
        for word in &self.overlap_vocabulary {
            node.push(KdlEntry::new(KdlValue::String(word.clone())));
        }
        doc.nodes_mut().push(node);

        doc
    }

    /// Set a config field by its KDL key name, parsing the string value.
    ///
    /// Returns an error message naming the key when the key is unknown or
    /// the value does not parse; no field changes on failure.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let mut next = self.clone();
        match key {
            "estimation-style" => {
                next.style = EstimationStyle::parse(value)
                    .ok_or_else(|| format!("estimation-style must be mean, median, or p80, got {}", value))?;
            }
            "working-hours-per-day" => next.working_hours_per_day = parse_float(key, value)?,
            "multiplier-junior" => next.multiplier_junior = parse_float(key, value)?,
            "multiplier-mid" => next.multiplier_mid = parse_float(key, value)?,
            "multiplier-senior" => next.multiplier_senior = parse_float(key, value)?,
            "buffer-percent" => next.buffer_percent = parse_float(key, value)?,
            "outlier-threshold" => next.outlier_threshold = parse_float(key, value)?,
            "target-percentile" => next.target_percentile = parse_float(key, value)?,
            "min-tracked-points" => {
                next.min_tracked_points = value
                    .parse::<usize>()
                    .map_err(|_| format!("min-tracked-points must be an integer, got {}", value))?;
            }
            "overlap-vocabulary" => {
                next.overlap_vocabulary = value
                    .split(',')
                    .map(|w| w.trim().to_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect();
            }
            _ => return Err(format!("unknown config key: {}", key)),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Get a config field's display value by its KDL key name.
    pub fn get_value(&self, key: &str) -> Option<String> {
        match key {
            "estimation-style" => Some(self.style.as_str().to_string()),
            "working-hours-per-day" => Some(self.working_hours_per_day.to_string()),
            "multiplier-junior" => Some(self.multiplier_junior.to_string()),
            "multiplier-mid" => Some(self.multiplier_mid.to_string()),
            "multiplier-senior" => Some(self.multiplier_senior.to_string()),
            "buffer-percent" => Some(self.buffer_percent.to_string()),
            "outlier-threshold" => Some(self.outlier_threshold.to_string()),
            "target-percentile" => Some(self.target_percentile.to_string()),
            "min-tracked-points" => Some(self.min_tracked_points.to_string()),
            "overlap-vocabulary" => Some(self.overlap_vocabulary.join(",")),
            _ => None,
        }
    }

    /// All (key, value) pairs in schema order, for `bp config list`.
    pub fn entries(&self) -> Vec<(String, String)> {
        [
            "estimation-style",
            "working-hours-per-day",
            "multiplier-junior",
            "multiplier-mid",
            "multiplier-senior",
            "buffer-percent",
            "outlier-threshold",
            "min-tracked-points",
            "target-percentile",
            "overlap-vocabulary",
        ]
        .iter()
        .map(|k| (k.to_string(), self.get_value(k).unwrap_or_default()))
        .collect()
    }
}

fn parse_float(key: &str, value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|_| format!("{} must be a number, got {}", key, value))
}

fn get_string(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)?
        .entries()
        .first()?
        .value()
        .as_string()
        .map(|s| s.to_string())
}

fn get_float(doc: &KdlDocument, name: &str) -> Option<f64> {
    let entry = doc.get(name)?.entries().first()?;
    entry
        .value()
        .as_float()
        .or_else(|| entry.value().as_integer().map(|i| i as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EstimationConfig::default();
        assert_eq!(config.style, EstimationStyle::Median);
        assert_eq!(config.multiplier_junior, 1.5);
        assert_eq!(config.multiplier_mid, 1.0);
        assert_eq!(config.multiplier_senior, 0.8);
        assert_eq!(config.buffer_percent, 0.0);
        assert_eq!(config.outlier_threshold, 3.0);
        assert_eq!(config.target_percentile, 80.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_kdl_roundtrip() {
        let mut config = EstimationConfig::default();
        config.style = EstimationStyle::P80;
        config.buffer_percent = 15.0;
        config.overlap_vocabulary = vec!["sync".to_string(), "auth".to_string()];

        let doc = config.to_kdl();
        let back = EstimationConfig::from_kdl(&doc);
        assert_eq!(back, config);
    }

    #[test]
    fn test_from_kdl_partial_document_keeps_defaults() {
        let doc: KdlDocument = "estimation-style \"mean\"".parse().unwrap();
        let config = EstimationConfig::from_kdl(&doc);
        assert_eq!(config.style, EstimationStyle::Mean);
        assert_eq!(config.working_hours_per_day, 8.0);
        assert_eq!(config.outlier_threshold, 3.0);
    }

    #[test]
    fn test_from_kdl_integer_accepted_for_float_field() {
        let doc: KdlDocument = "working-hours-per-day 6".parse().unwrap();
        let config = EstimationConfig::from_kdl(&doc);
        assert_eq!(config.working_hours_per_day, 6.0);
    }

    #[test]
    fn test_from_kdl_bad_style_ignored() {
        let doc: KdlDocument = "estimation-style \"p99\"".parse().unwrap();
        let config = EstimationConfig::from_kdl(&doc);
        assert_eq!(config.style, EstimationStyle::Median);
    }

    #[test]
    fn test_set_value_updates_and_validates() {
        let mut config = EstimationConfig::default();
        config.set_value("buffer-percent", "20").unwrap();
        assert_eq!(config.buffer_percent, 20.0);

        let err = config.set_value("buffer-percent", "-5").unwrap_err();
        assert!(err.contains("buffer-percent"));
        // failed set leaves the previous value in place
        assert_eq!(config.buffer_percent, 20.0);
    }

    #[test]
    fn test_set_value_unknown_key() {
        let mut config = EstimationConfig::default();
        assert!(config.set_value("velocity", "9000").is_err());
    }

    #[test]
    fn test_set_value_vocabulary_csv() {
        let mut config = EstimationConfig::default();
        config
            .set_value("overlap-vocabulary", "Sync, auth , ,calendar")
            .unwrap();
        assert_eq!(
            config.overlap_vocabulary,
            vec!["sync".to_string(), "auth".to_string(), "calendar".to_string()]
        );
    }

    #[test]
    fn test_validate_rejects_zero_multiplier() {
        let mut config = EstimationConfig::default();
        config.multiplier_senior = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_entries_covers_all_keys() {
        let config = EstimationConfig::default();
        let entries = config.entries();
        assert_eq!(entries.len(), 10);
        for (key, value) in entries {
            assert_eq!(config.get_value(&key), Some(value));
        }
    }
}
