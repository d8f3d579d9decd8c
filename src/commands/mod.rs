//! Command implementations for the Ballpark CLI.
//!
//! Each command returns a serializable result struct; `main` renders it as
//! JSON (the default) or human-readable text via [`CommandResult`].

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::action_log::ActionLog;
use crate::catalog::{self, NewFeature};
use crate::config::{self, ConfigSnapshot, ConfigStore};
use crate::engine::{self, EstimateRequest};
use crate::models::confidence::Confidence;
use crate::models::{
    ExperienceLevel, Feature, FeatureStatistics, ProjectEstimate, Team, TrackedTimeEntry,
};
use crate::storage::{generate_id, validate_id, Storage};
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult: Serialize {
    /// Format for human-readable output.
    fn to_human(&self) -> String;

    /// Serialize to JSON string.
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
    }
}

// === System ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub data_dir: String,
    pub already_initialized: bool,
}

impl CommandResult for InitResult {
    fn to_human(&self) -> String {
        if self.already_initialized {
            format!("Already initialized at {}", self.data_dir)
        } else {
            format!("Initialized ballpark data at {}", self.data_dir)
        }
    }
}

/// Initialize ballpark for the project.
pub fn system_init(repo_path: &Path) -> Result<InitResult> {
    let already_initialized = Storage::exists(repo_path)?;
    let storage = Storage::init(repo_path)?;
    Ok(InitResult {
        data_dir: storage.root().display().to_string(),
        already_initialized,
    })
}

#[derive(Debug, Serialize)]
pub struct RebuildResult {
    pub features: usize,
    pub time_entries: usize,
}

impl CommandResult for RebuildResult {
    fn to_human(&self) -> String {
        format!(
            "Rebuilt cache: {} features, {} time entries",
            self.features, self.time_entries
        )
    }
}

/// Rebuild the query cache from the JSONL files.
pub fn system_rebuild(repo_path: &Path) -> Result<RebuildResult> {
    let mut storage = Storage::open(repo_path)?;
    storage.rebuild_cache()?;
    Ok(RebuildResult {
        features: storage.list_features()?.len(),
        time_entries: storage.list_time_entries(None, None)?.len(),
    })
}

// === Features ===

#[derive(Debug, Serialize)]
pub struct FeatureResult {
    pub feature: Feature,
}

impl CommandResult for FeatureResult {
    fn to_human(&self) -> String {
        let f = &self.feature;
        let mut out = format!(
            "{} [{}] team={} seed={}h",
            f.name, f.id, f.team, f.seed_hours
        );
        if let Some(category) = &f.category {
            out.push_str(&format!(" category={}", category));
        }
        if !f.synonyms.is_empty() {
            out.push_str(&format!(" synonyms={}", f.synonyms.join(", ")));
        }
        if !f.seed_history.is_empty() {
            out.push_str(&format!(" (seed changed {}x)", f.seed_history.len()));
        }
        out
    }
}

#[derive(Debug, Serialize)]
pub struct FeatureListResult {
    pub count: usize,
    pub features: Vec<Feature>,
}

impl CommandResult for FeatureListResult {
    fn to_human(&self) -> String {
        if self.features.is_empty() {
            return "No features in the catalog.".to_string();
        }
        let mut lines = vec![format!("{} feature(s):", self.count)];
        for f in &self.features {
            lines.push(format!(
                "  {} [{}] team={} seed={}h",
                f.name, f.id, f.team, f.seed_hours
            ));
        }
        lines.join("\n")
    }
}

/// Add a feature to the catalog.
#[allow(clippy::too_many_arguments)]
pub fn feature_add(
    repo_path: &Path,
    name: &str,
    team: &str,
    seed_hours: f64,
    category: Option<String>,
    synonyms: Vec<String>,
    notes: Option<String>,
) -> Result<FeatureResult> {
    let team = Team::parse(team).ok_or_else(|| {
        Error::Validation(format!(
            "team must be frontend, backend, or both, got {}",
            team
        ))
    })?;

    let mut storage = Storage::open(repo_path)?;
    let feature = catalog::add_feature(
        &mut storage,
        NewFeature {
            name: name.to_string(),
            team,
            seed_hours,
            category,
            synonyms,
            notes,
        },
    )?;
    Ok(FeatureResult { feature })
}

/// List all features sorted by name.
pub fn feature_list(repo_path: &Path) -> Result<FeatureListResult> {
    let storage = Storage::open(repo_path)?;
    let features = storage.list_features()?;
    Ok(FeatureListResult {
        count: features.len(),
        features,
    })
}

/// Show one feature by ID.
pub fn feature_show(repo_path: &Path, id: &str) -> Result<FeatureResult> {
    validate_id(id, "bpf")?;
    let storage = Storage::open(repo_path)?;
    Ok(FeatureResult {
        feature: storage.get_feature(id)?,
    })
}

/// Update a feature's seed hours.
pub fn feature_set_seed(repo_path: &Path, id: &str, hours: f64) -> Result<FeatureResult> {
    validate_id(id, "bpf")?;
    let mut storage = Storage::open(repo_path)?;
    let feature = catalog::update_seed_hours(&mut storage, id, hours)?;
    Ok(FeatureResult { feature })
}

/// Add a synonym to a feature.
pub fn feature_add_synonym(repo_path: &Path, id: &str, synonym: &str) -> Result<FeatureResult> {
    validate_id(id, "bpf")?;
    let mut storage = Storage::open(repo_path)?;
    let feature = catalog::add_synonym(&mut storage, id, synonym)?;
    Ok(FeatureResult { feature })
}

#[derive(Debug, Serialize)]
pub struct RemoveResult {
    pub id: String,
    pub removed: bool,
}

impl CommandResult for RemoveResult {
    fn to_human(&self) -> String {
        format!("Removed {}", self.id)
    }
}

/// Remove a feature from the catalog.
pub fn feature_rm(repo_path: &Path, id: &str) -> Result<RemoveResult> {
    validate_id(id, "bpf")?;
    let mut storage = Storage::open(repo_path)?;
    catalog::remove_feature(&mut storage, id)?;
    Ok(RemoveResult {
        id: id.to_string(),
        removed: true,
    })
}

/// Substring search over names and synonyms.
pub fn feature_search(repo_path: &Path, query: &str) -> Result<FeatureListResult> {
    let storage = Storage::open(repo_path)?;
    let features = storage.list_features()?;
    let hits: Vec<Feature> = catalog::search(&features, query)
        .into_iter()
        .cloned()
        .collect();
    Ok(FeatureListResult {
        count: hits.len(),
        features: hits,
    })
}

// === Tracked time ===

#[derive(Debug, Serialize)]
pub struct TimeEntryResult {
    pub entry: TrackedTimeEntry,
}

impl CommandResult for TimeEntryResult {
    fn to_human(&self) -> String {
        let e = &self.entry;
        format!(
            "{}: {}h on '{}' by {} ({})",
            e.id, e.hours, e.feature_label, e.member, e.team
        )
    }
}

/// Log a single tracked-time entry.
pub fn time_add(
    repo_path: &Path,
    feature: &str,
    hours: f64,
    team: &str,
    member: &str,
    category: Option<String>,
    date: Option<String>,
) -> Result<TimeEntryResult> {
    let team = Team::parse(team).ok_or_else(|| {
        Error::Validation(format!(
            "team must be frontend, backend, or both, got {}",
            team
        ))
    })?;
    let date = date
        .map(|d| {
            NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .map_err(|_| Error::Validation(format!("date must be YYYY-MM-DD, got {}", d)))
        })
        .transpose()?;

    let mut entry = TrackedTimeEntry::new(
        generate_id("bpt", feature),
        team,
        member.to_string(),
        feature.to_string(),
        hours,
    );
    entry.category = category;
    entry.date = date;

    let mut storage = Storage::open(repo_path)?;
    storage.add_time_entry(&entry)?;
    Ok(TimeEntryResult { entry })
}

#[derive(Debug, Serialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub errors: Vec<RowError>,
}

impl CommandResult for ImportResult {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Imported {} entr(ies)", self.imported)];
        for err in &self.errors {
            lines.push(format!("  row {}: {}", err.row, err.message));
        }
        lines.join("\n")
    }
}

/// Bulk-import tracked-time entries from a CSV file.
///
/// Bad rows are collected per row number rather than aborting the batch;
/// every valid row is ingested.
pub fn time_import(repo_path: &Path, file: &Path) -> Result<ImportResult> {
    let mut storage = Storage::open(repo_path)?;
    let text = std::fs::read_to_string(file)?;

    let mut lines = text.lines().enumerate();
    let Some((_, header)) = lines.next() else {
        return Err(Error::Validation("CSV file is empty".to_string()));
    };

    let columns: Vec<String> = split_csv_line(header)
        .iter()
        .map(|c| c.trim().to_lowercase())
        .collect();
    for required in ["team", "member", "feature", "hours"] {
        if !columns.iter().any(|c| c == required) {
            return Err(Error::Validation(format!(
                "CSV header is missing required column: {}",
                required
            )));
        }
    }
    let col = |name: &str| columns.iter().position(|c| c == name);
    let (team_col, member_col, feature_col, hours_col) = (
        col("team").unwrap_or_default(),
        col("member").unwrap_or_default(),
        col("feature").unwrap_or_default(),
        col("hours").unwrap_or_default(),
    );
    let category_col = col("category");
    let date_col = col("date");

    let mut imported = 0;
    let mut errors = Vec::new();

    for (index, line) in lines {
        let row = index + 1; // 1-based, header is row 1
        if line.trim().is_empty() {
            continue;
        }

        match parse_import_row(
            line, team_col, member_col, feature_col, hours_col, category_col, date_col,
        ) {
            Ok(entry) => match storage.add_time_entry(&entry) {
                Ok(()) => imported += 1,
                Err(e) => errors.push(RowError {
                    row,
                    message: e.to_string(),
                }),
            },
            Err(message) => errors.push(RowError { row, message }),
        }
    }

    Ok(ImportResult { imported, errors })
}

fn parse_import_row(
    line: &str,
    team_col: usize,
    member_col: usize,
    feature_col: usize,
    hours_col: usize,
    category_col: Option<usize>,
    date_col: Option<usize>,
) -> std::result::Result<TrackedTimeEntry, String> {
    let fields = split_csv_line(line);
    let get = |i: usize| fields.get(i).map(|s| s.trim()).unwrap_or("");

    let team = Team::parse(get(team_col))
        .ok_or_else(|| format!("team must be frontend, backend, or both, got '{}'", get(team_col)))?;
    let hours: f64 = get(hours_col)
        .parse()
        .map_err(|_| format!("hours must be a number, got '{}'", get(hours_col)))?;

    let mut entry = TrackedTimeEntry::new(
        generate_id("bpt", line),
        team,
        get(member_col).to_string(),
        get(feature_col).to_string(),
        hours,
    );
    entry.category = category_col
        .map(|i| get(i).to_string())
        .filter(|s| !s.is_empty());
    entry.date = match date_col.map(|i| get(i)).filter(|s| !s.is_empty()) {
        Some(d) => Some(
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|_| format!("date must be YYYY-MM-DD, got '{}'", d))?,
        ),
        None => None,
    };

    entry.validate().map_err(|e| e.to_string())?;
    Ok(entry)
}

/// Split one CSV line into fields, honoring double-quoted fields with
/// embedded commas and doubled-quote escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[derive(Debug, Serialize)]
pub struct TimeListResult {
    pub count: usize,
    pub entries: Vec<TrackedTimeEntry>,
}

impl CommandResult for TimeListResult {
    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No tracked-time entries.".to_string();
        }
        let mut lines = vec![format!("{} entr(ies):", self.count)];
        for e in &self.entries {
            lines.push(format!(
                "  {} {}h '{}' by {} ({})",
                e.id, e.hours, e.feature_label, e.member, e.team
            ));
        }
        lines.join("\n")
    }
}

/// List tracked-time entries, optionally filtered.
pub fn time_list(
    repo_path: &Path,
    member: Option<&str>,
    feature: Option<&str>,
) -> Result<TimeListResult> {
    let storage = Storage::open(repo_path)?;
    let entries = storage.list_time_entries(member, feature)?;
    Ok(TimeListResult {
        count: entries.len(),
        entries,
    })
}

// === Statistics & estimates ===

#[derive(Debug, Serialize)]
pub struct StatsResult {
    pub feature_name: String,
    pub feature_id: String,
    pub statistics: FeatureStatistics,
    pub confidence: Confidence,
}

impl CommandResult for StatsResult {
    fn to_human(&self) -> String {
        let s = &self.statistics;
        let mut out = format!(
            "{}: {} entries, mean={:.2}h median={:.2}h p={:.2}h stddev={:.2} ({:?} coverage, {} confidence)",
            self.feature_name,
            s.count,
            s.mean,
            s.median,
            s.percentile,
            s.std_dev,
            s.coverage,
            self.confidence
        );
        for flag in &s.outliers {
            out.push_str(&format!(
                "\n  outlier: {} at {}h (threshold {}h)",
                flag.entry_id, flag.hours, flag.threshold
            ));
        }
        if let Some(robust) = &s.robust {
            out.push_str(&format!(
                "\n  robust: mean={:.2}h median={:.2}h p={:.2}h stddev={:.2}",
                robust.mean, robust.median, robust.percentile, robust.std_dev
            ));
        }
        out
    }
}

/// Show the statistics bundle for one feature name or synonym.
pub fn stats(repo_path: &Path, name: &str) -> Result<StatsResult> {
    let storage = Storage::open(repo_path)?;
    let features = storage.list_features()?;
    let feature = catalog::find_by_name_or_synonym(&features, name)
        .ok_or_else(|| Error::NotFound(format!("No catalog feature matches: {}", name)))?;

    let snapshot = load_snapshot(&storage)?;
    let entries = storage.list_time_entries(None, None)?;
    let statistics = engine::statistics_for(feature, &entries, &snapshot)?;
    let confidence = engine::confidence_for(&statistics, &snapshot);

    Ok(StatsResult {
        feature_name: feature.name.clone(),
        feature_id: feature.id.clone(),
        statistics,
        confidence,
    })
}

#[derive(Debug, Serialize)]
pub struct EstimateResult {
    pub estimate: ProjectEstimate,

    /// Grand total expressed in working days under the active config
    pub working_days: f64,
}

impl CommandResult for EstimateResult {
    fn to_human(&self) -> String {
        let e = &self.estimate;
        let mut lines = vec![format!("Estimate {} ({} features):", e.id, e.line_items.len())];
        for line in &e.line_items {
            let marker = if line.is_new_feature { " NEW" } else { "" };
            lines.push(format!(
                "  {:<30} {:>7.1}h  {} {} {}{}",
                line.feature_name,
                line.hours,
                line.team,
                line.basis.as_str(),
                line.confidence,
                marker
            ));
        }
        lines.push(format!(
            "Totals: frontend {:.1}h, backend {:.1}h, grand {:.1}h ({:.1} days)",
            e.frontend_hours, e.backend_hours, e.grand_total_hours, self.working_days
        ));
        if e.buffer_hours > 0.0 {
            lines.push(format!("Buffer: {:.1}h (kept separate)", e.buffer_hours));
        }
        for warning in &e.warnings {
            lines.push(format!(
                "Overlap '{}': {} - {}",
                warning.keyword,
                warning.features.join(" / "),
                warning.suggestion
            ));
        }
        lines.join("\n")
    }
}

/// Compute and store a project estimate.
pub fn estimate(
    repo_path: &Path,
    names: Vec<String>,
    experience: Option<String>,
    seed_default: Option<f64>,
) -> Result<EstimateResult> {
    let experience = experience
        .map(|s| {
            ExperienceLevel::parse(&s).ok_or_else(|| {
                Error::Validation(format!(
                    "experience must be junior, mid, or senior, got {}",
                    s
                ))
            })
        })
        .transpose()?;

    let mut storage = Storage::open(repo_path)?;
    let snapshot = load_snapshot(&storage)?;
    let features = storage.list_features()?;
    let entries = storage.list_time_entries(None, None)?;

    let request = EstimateRequest {
        feature_names: names,
        experience,
        seed_default,
    };
    let estimate = engine::estimate_project(&features, &entries, &request, &snapshot)?;
    storage.append_estimate(&estimate)?;

    let working_days = estimate.grand_total_hours / snapshot.config.working_hours_per_day;
    Ok(EstimateResult {
        estimate,
        working_days,
    })
}

/// Load the persisted config and wrap it in a one-shot snapshot.
fn load_snapshot(storage: &Storage) -> Result<ConfigSnapshot> {
    let config = config::load_config(storage.root())?;
    Ok(ConfigStore::new(config).snapshot())
}

// === Config ===

#[derive(Debug, Serialize)]
pub struct ConfigValueResult {
    pub key: String,
    pub value: String,
}

impl CommandResult for ConfigValueResult {
    fn to_human(&self) -> String {
        format!("{} = {}", self.key, self.value)
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigListResult {
    pub entries: Vec<ConfigValueResult>,
}

impl CommandResult for ConfigListResult {
    fn to_human(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.to_human())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Get one config value.
pub fn config_get(repo_path: &Path, key: &str) -> Result<ConfigValueResult> {
    let storage = Storage::open(repo_path)?;
    let config = config::load_config(storage.root())?;
    let value = config
        .get_value(key)
        .ok_or_else(|| Error::NotFound(format!("Unknown config key: {}", key)))?;
    Ok(ConfigValueResult {
        key: key.to_string(),
        value,
    })
}

/// Set one config value and persist the document.
pub fn config_set(repo_path: &Path, key: &str, value: &str) -> Result<ConfigValueResult> {
    let storage = Storage::open(repo_path)?;
    let mut config = config::load_config(storage.root())?;
    config.set_value(key, value).map_err(Error::Validation)?;
    config::save_config(storage.root(), &config)?;

    Ok(ConfigValueResult {
        key: key.to_string(),
        value: config.get_value(key).unwrap_or_default(),
    })
}

/// List all config values.
pub fn config_list(repo_path: &Path) -> Result<ConfigListResult> {
    let storage = Storage::open(repo_path)?;
    let config = config::load_config(storage.root())?;
    Ok(ConfigListResult {
        entries: config
            .entries()
            .into_iter()
            .map(|(key, value)| ConfigValueResult { key, value })
            .collect(),
    })
}

// === Audit log ===

#[derive(Debug, Serialize)]
pub struct LogResult {
    pub count: usize,
    pub entries: Vec<ActionLog>,
}

impl CommandResult for LogResult {
    fn to_human(&self) -> String {
        if self.entries.is_empty() {
            return "No logged actions.".to_string();
        }
        let mut lines = vec![format!("{} action(s):", self.count)];
        for e in &self.entries {
            let status = if e.success { "ok" } else { "failed" };
            lines.push(format!(
                "  {} {} [{}] {}ms by {}",
                e.timestamp.format("%Y-%m-%d %H:%M:%S"),
                e.command,
                status,
                e.duration_ms,
                e.user
            ));
        }
        lines.join("\n")
    }
}

/// Show the audit trail of commands.
pub fn log_show(repo_path: &Path) -> Result<LogResult> {
    let entries = crate::action_log::read_log(repo_path)?;
    Ok(LogResult {
        count: entries.len(),
        entries,
    })
}
