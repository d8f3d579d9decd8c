//! Storage layer for Ballpark data.
//!
//! This module handles persistence of the feature catalog, tracked-time
//! entries, and computed estimate snapshots.
//!
//! Layout per project, under `~/.local/share/ballpark/<repo-hash>/`:
//! - JSONL files as append-only source of truth (`features.jsonl`,
//!   `time-entries.jsonl`, `estimates.jsonl`)
//! - SQLite for indexed queries (`cache.db`)
//! - `config.kdl` (owned by the `config` module)
//!
//! The data root can be overridden with the `BP_DATA_DIR` environment
//! variable, which tests use for isolation.

use crate::models::{normalize_label, Feature, ProjectEstimate, TrackedTimeEntry};
use crate::{Error, Result};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// A tombstone line appended to features.jsonl on deletion so cache
/// rebuilds do not resurrect removed features.
#[derive(Debug, Serialize, Deserialize)]
struct DeleteMarker {
    #[serde(rename = "type")]
    entity_type: String,
    id: String,
}

/// Storage manager for a single project.
pub struct Storage {
    /// Root directory for this project's data
    root: PathBuf,
    /// SQLite connection for indexed queries
    conn: Connection,
}

impl Storage {
    /// Open or create storage for the given project path.
    pub fn open(repo_path: &Path) -> Result<Self> {
        let root = get_storage_dir(repo_path)?;
        Self::open_at(root)
    }

    /// Initialize storage for a new project.
    pub fn init(repo_path: &Path) -> Result<Self> {
        let root = get_storage_dir(repo_path)?;
        Self::init_at(root)
    }

    /// Check if storage exists for the given project.
    pub fn exists(repo_path: &Path) -> Result<bool> {
        let root = get_storage_dir(repo_path)?;
        Ok(root.exists() && root.join("cache.db").exists())
    }

    /// Open storage rooted under an explicit data directory (DI for tests).
    pub fn open_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<Self> {
        let root = storage_dir_under(repo_path, data_dir)?;
        Self::open_at(root)
    }

    /// Initialize storage rooted under an explicit data directory (DI for tests).
    pub fn init_with_data_dir(repo_path: &Path, data_dir: &Path) -> Result<Self> {
        let root = storage_dir_under(repo_path, data_dir)?;
        Self::init_at(root)
    }

    fn open_at(root: PathBuf) -> Result<Self> {
        if !root.exists() {
            return Err(Error::NotInitialized);
        }

        let db_path = root.join("cache.db");
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self { root, conn })
    }

    fn init_at(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;

        // Create empty JSONL files
        let files = ["features.jsonl", "time-entries.jsonl", "estimates.jsonl"];
        for file in files {
            let path = root.join(file);
            if !path.exists() {
                File::create(&path)?;
            }
        }

        let db_path = root.join("cache.db");
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;

        Ok(Self { root, conn })
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS features (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                name_norm TEXT NOT NULL,
                team TEXT NOT NULL,
                category TEXT,
                seed_hours REAL NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS feature_synonyms (
                feature_id TEXT NOT NULL,
                synonym TEXT NOT NULL,
                synonym_norm TEXT NOT NULL,
                PRIMARY KEY (feature_id, synonym_norm),
                FOREIGN KEY (feature_id) REFERENCES features(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS time_entries (
                id TEXT PRIMARY KEY,
                team TEXT NOT NULL,
                member TEXT NOT NULL,
                feature_label TEXT NOT NULL,
                label_norm TEXT NOT NULL,
                hours REAL NOT NULL,
                category TEXT,
                date TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_features_name_norm ON features(name_norm);
            CREATE INDEX IF NOT EXISTS idx_synonyms_norm ON feature_synonyms(synonym_norm);
            CREATE INDEX IF NOT EXISTS idx_entries_label_norm ON time_entries(label_norm);
            CREATE INDEX IF NOT EXISTS idx_entries_member ON time_entries(member);
            "#,
        )?;

        Ok(())
    }

    /// Rebuild the SQLite cache from the JSONL files.
    pub fn rebuild_cache(&mut self) -> Result<()> {
        self.conn.execute("PRAGMA foreign_keys = OFF", [])?;

        self.conn.execute_batch(
            r#"
            DELETE FROM feature_synonyms;
            DELETE FROM features;
            DELETE FROM time_entries;
            "#,
        )?;

        // Replay features.jsonl, honoring delete tombstones
        let features_path = self.root.join("features.jsonl");
        if features_path.exists() {
            let file = File::open(&features_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(marker) = serde_json::from_str::<DeleteMarker>(&line) {
                    if marker.entity_type == "feature_delete" {
                        self.uncache_feature(&marker.id)?;
                        continue;
                    }
                }
                if let Ok(feature) = serde_json::from_str::<Feature>(&line) {
                    if feature.entity_type == "feature" {
                        self.cache_feature(&feature)?;
                    }
                }
            }
        }

        // Replay time-entries.jsonl
        let entries_path = self.root.join("time-entries.jsonl");
        if entries_path.exists() {
            let file = File::open(&entries_path)?;
            let reader = BufReader::new(file);

            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(entry) = serde_json::from_str::<TrackedTimeEntry>(&line) {
                    if entry.entity_type == "time" {
                        self.cache_entry(&entry)?;
                    }
                }
            }
        }

        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(())
    }

    /// Cache a feature in SQLite for fast querying.
    fn cache_feature(&self, feature: &Feature) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO features
            (id, name, name_norm, team, category, seed_hours, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                feature.id,
                feature.name,
                normalize_label(&feature.name),
                feature.team.as_str(),
                feature.category,
                feature.seed_hours,
                feature.created_at.to_rfc3339(),
                feature.updated_at.to_rfc3339(),
            ],
        )?;

        self.conn.execute(
            "DELETE FROM feature_synonyms WHERE feature_id = ?1",
            [&feature.id],
        )?;
        for synonym in &feature.synonyms {
            self.conn.execute(
                "INSERT OR REPLACE INTO feature_synonyms (feature_id, synonym, synonym_norm)
                 VALUES (?1, ?2, ?3)",
                params![feature.id, synonym, normalize_label(synonym)],
            )?;
        }

        Ok(())
    }

    /// Remove a feature from the SQLite cache.
    fn uncache_feature(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM feature_synonyms WHERE feature_id = ?1", [id])?;
        self.conn.execute("DELETE FROM features WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Cache a time entry in SQLite for fast querying.
    fn cache_entry(&self, entry: &TrackedTimeEntry) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO time_entries
            (id, team, member, feature_label, label_norm, hours, category, date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                entry.id,
                entry.team.as_str(),
                entry.member,
                entry.feature_label,
                normalize_label(&entry.feature_label),
                entry.hours,
                entry.category,
                entry.date.map(|d| d.to_string()),
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // === Feature Operations ===

    /// Persist a new feature.
    pub fn create_feature(&mut self, feature: &Feature) -> Result<()> {
        self.append_feature_line(feature)?;
        self.cache_feature(feature)?;
        Ok(())
    }

    /// Get a feature by ID.
    ///
    /// The cache is authoritative for liveness; the JSONL log holds the
    /// latest version of the record.
    pub fn get_feature(&self, id: &str) -> Result<Feature> {
        let live: bool = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM features WHERE id = ?1",
                [id],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n > 0)?;
        if !live {
            return Err(Error::NotFound(format!("Feature not found: {}", id)));
        }

        let features_path = self.root.join("features.jsonl");
        let file = File::open(&features_path)?;
        let reader = BufReader::new(file);

        let mut latest: Option<Feature> = None;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(feature) = serde_json::from_str::<Feature>(&line) {
                if feature.entity_type == "feature" && feature.id == id {
                    latest = Some(feature);
                }
            }
        }

        latest.ok_or_else(|| Error::NotFound(format!("Feature not found: {}", id)))
    }

    /// List all live features, sorted alphabetically by name.
    pub fn list_features(&self) -> Result<Vec<Feature>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM features ORDER BY name_norm ASC, id ASC")?;
        let ids: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut features = Vec::new();
        for id in ids {
            if let Ok(feature) = self.get_feature(&id) {
                features.push(feature);
            }
        }

        Ok(features)
    }

    /// Update a feature (appends the new version to the log).
    pub fn update_feature(&mut self, feature: &Feature) -> Result<()> {
        self.get_feature(&feature.id)?;
        self.append_feature_line(feature)?;
        self.cache_feature(feature)?;
        Ok(())
    }

    /// Delete a feature by ID.
    ///
    /// Appends a tombstone so cache rebuilds stay consistent. Estimate
    /// snapshots computed earlier are untouched.
    pub fn delete_feature(&mut self, id: &str) -> Result<()> {
        self.get_feature(id)?;

        let marker = DeleteMarker {
            entity_type: "feature_delete".to_string(),
            id: id.to_string(),
        };
        let features_path = self.root.join("features.jsonl");
        let mut file = OpenOptions::new().append(true).open(&features_path)?;
        writeln!(file, "{}", serde_json::to_string(&marker)?)?;

        self.uncache_feature(id)?;
        Ok(())
    }

    fn append_feature_line(&self, feature: &Feature) -> Result<()> {
        let features_path = self.root.join("features.jsonl");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&features_path)?;
        writeln!(file, "{}", serde_json::to_string(feature)?)?;
        Ok(())
    }

    // === Time Entry Operations ===

    /// Persist a new tracked-time entry. Entries are immutable once stored.
    pub fn add_time_entry(&mut self, entry: &TrackedTimeEntry) -> Result<()> {
        entry.validate()?;

        let entries_path = self.root.join("time-entries.jsonl");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&entries_path)?;
        writeln!(file, "{}", serde_json::to_string(entry)?)?;

        self.cache_entry(entry)?;
        Ok(())
    }

    /// Get a time entry by ID.
    pub fn get_time_entry(&self, id: &str) -> Result<TrackedTimeEntry> {
        let entries_path = self.root.join("time-entries.jsonl");
        let file = File::open(&entries_path)?;
        let reader = BufReader::new(file);

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(entry) = serde_json::from_str::<TrackedTimeEntry>(&line) {
                if entry.id == id {
                    return Ok(entry);
                }
            }
        }

        Err(Error::NotFound(format!("Time entry not found: {}", id)))
    }

    /// List time entries, optionally filtered by member or feature label.
    ///
    /// Label filtering matches on the normalized label, so queries differing
    /// only in case or spacing hit the same group.
    pub fn list_time_entries(
        &self,
        member: Option<&str>,
        feature_label: Option<&str>,
    ) -> Result<Vec<TrackedTimeEntry>> {
        let mut sql = String::from("SELECT id FROM time_entries WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(m) = member {
            sql.push_str(" AND member = ?");
            params_vec.push(Box::new(m.to_string()));
        }
        if let Some(label) = feature_label {
            sql.push_str(" AND label_norm = ?");
            params_vec.push(Box::new(normalize_label(label)));
        }

        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let ids: Vec<String> = stmt
            .query_map(params_refs.as_slice(), |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        let mut entries = Vec::new();
        for id in ids {
            if let Ok(entry) = self.get_time_entry(&id) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    // === Estimate Snapshots ===

    /// Append a computed estimate snapshot.
    pub fn append_estimate(&mut self, estimate: &ProjectEstimate) -> Result<()> {
        let estimates_path = self.root.join("estimates.jsonl");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&estimates_path)?;
        writeln!(file, "{}", serde_json::to_string(estimate)?)?;
        Ok(())
    }

    /// List all stored estimate snapshots in creation order.
    pub fn list_estimates(&self) -> Result<Vec<ProjectEstimate>> {
        let estimates_path = self.root.join("estimates.jsonl");
        if !estimates_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&estimates_path)?;
        let reader = BufReader::new(file);

        let mut estimates = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(estimate) = serde_json::from_str::<ProjectEstimate>(&line) {
                estimates.push(estimate);
            }
        }

        Ok(estimates)
    }

    /// Root directory of this project's data.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Resolve the data root: `BP_DATA_DIR` override, else the XDG data dir.
fn resolve_data_root() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BP_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("ballpark"))
}

/// Compute the per-project storage directory for the given project path.
pub fn get_storage_dir(repo_path: &Path) -> Result<PathBuf> {
    storage_dir_under(repo_path, &resolve_data_root()?)
}

fn storage_dir_under(repo_path: &Path, data_root: &Path) -> Result<PathBuf> {
    let repo_canonical = repo_path
        .canonicalize()
        .map_err(|e| Error::Other(format!("Could not canonicalize project path: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(repo_canonical.to_string_lossy().as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    let short_hash = &hash_hex[..12];

    Ok(data_root.join(short_hash))
}

/// Walk upward from `start` looking for a `.git` directory.
///
/// Returns the repository root so storage resolves identically from any
/// subdirectory; `None` when not inside a git repository.
pub fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Generate a unique ID for an entity.
///
/// Format: `<prefix>-<4 hex chars>`
/// - Feature prefix: "bpf"
/// - Time entry prefix: "bpt"
/// - Estimate prefix: "bpe"
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    if !id.starts_with(&format!("{}-", prefix)) {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    }

    let suffix = &id[prefix.len() + 1..];
    if suffix.len() != 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be 4 hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}
