//! Feature catalog operations.
//!
//! The catalog owns `Feature` records and resolves free-text names to
//! canonical features via normalized matching. Mutations go through
//! `Storage` with all-or-nothing validation; lookups are pure functions
//! over an owned feature list, so an in-flight estimate computation works
//! against a consistent view even if the catalog changes concurrently.

use chrono::Utc;

use crate::models::{normalize_label, Feature, SeedTimeChange, Team};
use crate::storage::{generate_id, Storage};
use crate::{Error, Result};

/// Input for creating a catalog feature.
#[derive(Debug, Clone)]
pub struct NewFeature {
    pub name: String,
    pub team: Team,
    pub seed_hours: f64,
    pub category: Option<String>,
    pub synonyms: Vec<String>,
    pub notes: Option<String>,
}

/// Validate and persist a new feature.
///
/// All-or-nothing: any validation failure names the offending field and
/// leaves the catalog untouched.
pub fn add_feature(storage: &mut Storage, input: NewFeature) -> Result<Feature> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::Validation("name must not be empty".to_string()));
    }
    if !input.seed_hours.is_finite() || input.seed_hours <= 0.0 {
        return Err(Error::Validation(format!(
            "seed-hours must be a positive finite number, got {}",
            input.seed_hours
        )));
    }

    let synonyms: Vec<String> = input
        .synonyms
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    // Name and synonyms must be unique under normalization, both within
    // this input and against the existing catalog.
    let mut labels = vec![normalize_label(&name)];
    for synonym in &synonyms {
        let norm = normalize_label(synonym);
        if labels.contains(&norm) {
            return Err(Error::Validation(format!(
                "synonym duplicates another label on this feature: {}",
                synonym
            )));
        }
        labels.push(norm);
    }

    let existing = storage.list_features()?;
    for label in &labels {
        if let Some(feature) = find_by_normalized(&existing, label) {
            return Err(Error::Validation(format!(
                "name or synonym '{}' already used by feature {} ({})",
                label, feature.id, feature.name
            )));
        }
    }

    let mut feature = Feature::new(
        generate_id("bpf", &name),
        name,
        input.team,
        input.seed_hours,
    );
    feature.category = input.category;
    feature.synonyms = synonyms;
    feature.notes = input.notes;

    storage.create_feature(&feature)?;
    Ok(feature)
}

/// Update a feature's seed hours, appending the previous value to its
/// history before applying the new one. History never shrinks.
pub fn update_seed_hours(storage: &mut Storage, id: &str, new_hours: f64) -> Result<Feature> {
    if !new_hours.is_finite() || new_hours <= 0.0 {
        return Err(Error::Validation(format!(
            "seed-hours must be a positive finite number, got {}",
            new_hours
        )));
    }

    let mut feature = storage.get_feature(id)?;
    let now = Utc::now();
    feature.seed_history.push(SeedTimeChange {
        previous_hours: feature.seed_hours,
        new_hours,
        changed_at: now,
    });
    feature.seed_hours = new_hours;
    feature.updated_at = now;

    storage.update_feature(&feature)?;
    Ok(feature)
}

/// Add a synonym to an existing feature, enforcing catalog-wide uniqueness.
pub fn add_synonym(storage: &mut Storage, id: &str, synonym: &str) -> Result<Feature> {
    let synonym = synonym.trim().to_string();
    if synonym.is_empty() {
        return Err(Error::Validation("synonym must not be empty".to_string()));
    }

    let norm = normalize_label(&synonym);
    let existing = storage.list_features()?;
    if let Some(feature) = find_by_normalized(&existing, &norm) {
        return Err(Error::Validation(format!(
            "name or synonym '{}' already used by feature {} ({})",
            synonym, feature.id, feature.name
        )));
    }

    let mut feature = storage.get_feature(id)?;
    feature.synonyms.push(synonym);
    feature.updated_at = Utc::now();
    storage.update_feature(&feature)?;
    Ok(feature)
}

/// Remove a feature from the catalog.
pub fn remove_feature(storage: &mut Storage, id: &str) -> Result<()> {
    storage.delete_feature(id)
}

/// Resolve a free-text query to a feature by exact normalized match on
/// name or any synonym. Returns `None` when nothing matches exactly.
pub fn find_by_name_or_synonym<'a>(features: &'a [Feature], query: &str) -> Option<&'a Feature> {
    let norm = normalize_label(query);
    if norm.is_empty() {
        return None;
    }
    find_by_normalized(features, &norm)
}

/// Case-insensitive substring search over names and synonyms.
///
/// Returns all matches; ordering follows the input list (the storage list
/// is already name-sorted).
pub fn search<'a>(features: &'a [Feature], query: &str) -> Vec<&'a Feature> {
    let norm = normalize_label(query);
    if norm.is_empty() {
        return Vec::new();
    }

    features
        .iter()
        .filter(|f| {
            normalize_label(&f.name).contains(&norm)
                || f.synonyms
                    .iter()
                    .any(|s| normalize_label(s).contains(&norm))
        })
        .collect()
}

fn find_by_normalized<'a>(features: &'a [Feature], norm: &str) -> Option<&'a Feature> {
    features.iter().find(|f| {
        normalize_label(&f.name) == norm || f.synonyms.iter().any(|s| normalize_label(s) == norm)
    })
}
