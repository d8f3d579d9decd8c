//! Configuration management for Ballpark.
//!
//! The active `EstimationConfig` lives in `config.kdl` inside the project's
//! data directory and is loaded fresh by each CLI invocation. Library users
//! embedding the engine in a long-running process wrap the config in a
//! [`ConfigStore`], which hands out generation-stamped snapshots: every
//! estimate computation takes one snapshot at its start and uses it
//! throughout, so a concurrent config change never produces a half-old,
//! half-new estimate, and nothing caches derived statistics across
//! generations.

pub mod schema;

pub use schema::EstimationConfig;

use std::fs;
use std::path::Path;
use std::sync::RwLock;

use kdl::KdlDocument;

use crate::models::ExperienceLevel;
use crate::{Error, Result};

/// File name of the config document inside a project's data directory.
pub const CONFIG_FILE: &str = "config.kdl";

/// Load the config from `config.kdl` in the given data directory.
///
/// A missing file yields the built-in defaults; a file that fails to parse
/// is an error (a corrupt config should be fixed, not silently replaced).
pub fn load_config(data_dir: &Path) -> Result<EstimationConfig> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(EstimationConfig::default());
    }

    let text = fs::read_to_string(&path)?;
    let doc: KdlDocument = text
        .parse()
        .map_err(|e| Error::Other(format!("Could not parse {}: {}", path.display(), e)))?;
    Ok(EstimationConfig::from_kdl(&doc))
}

/// Save the config to `config.kdl` in the given data directory.
pub fn save_config(data_dir: &Path, config: &EstimationConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let mut doc = config.to_kdl();
    doc.autoformat();
    fs::write(&path, doc.to_string())?;
    Ok(())
}

/// A consistent view of the configuration, taken at the start of a
/// computation and used throughout it.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    /// Generation counter at snapshot time; any derived value must be keyed
    /// on this, never on a feature name alone
    pub generation: u64,

    /// The configuration as of snapshot time
    pub config: EstimationConfig,
}

/// Shared, versioned holder of the active configuration.
///
/// Writes are mutually exclusive with snapshot reads via the inner lock;
/// each successful mutation bumps the generation so stale derived values
/// are distinguishable from fresh ones.
pub struct ConfigStore {
    inner: RwLock<(u64, EstimationConfig)>,
}

impl ConfigStore {
    /// Create a store holding the given configuration at generation 0.
    pub fn new(config: EstimationConfig) -> Self {
        Self {
            inner: RwLock::new((0, config)),
        }
    }

    /// Take a consistent snapshot for one computation.
    pub fn snapshot(&self) -> ConfigSnapshot {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        ConfigSnapshot {
            generation: guard.0,
            config: guard.1.clone(),
        }
    }

    /// Current generation counter.
    pub fn generation(&self) -> u64 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).0
    }

    /// Apply a mutation, validate the result, and bump the generation.
    ///
    /// On validation failure the stored config is left untouched.
    pub fn update<F>(&self, mutate: F) -> Result<u64>
    where
        F: FnOnce(&mut EstimationConfig),
    {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let mut next = guard.1.clone();
        mutate(&mut next);
        next.validate().map_err(Error::Validation)?;

        guard.0 += 1;
        guard.1 = next;
        Ok(guard.0)
    }

    /// Replace the estimation style.
    pub fn set_estimation_style(&self, style: crate::models::EstimationStyle) -> Result<u64> {
        self.update(|c| c.style = style)
    }

    /// Replace the buffer percentage.
    pub fn set_buffer_percent(&self, percent: f64) -> Result<u64> {
        self.update(|c| c.buffer_percent = percent)
    }

    /// Replace the working hours per day.
    pub fn set_working_hours_per_day(&self, hours: f64) -> Result<u64> {
        self.update(|c| c.working_hours_per_day = hours)
    }

    /// Replace one experience multiplier.
    pub fn set_experience_multiplier(&self, level: ExperienceLevel, value: f64) -> Result<u64> {
        self.update(|c| match level {
            ExperienceLevel::Junior => c.multiplier_junior = value,
            ExperienceLevel::Mid => c.multiplier_mid = value,
            ExperienceLevel::Senior => c.multiplier_senior = value,
        })
    }

    /// Replace all three experience multipliers at once.
    pub fn set_experience_multipliers(&self, junior: f64, mid: f64, senior: f64) -> Result<u64> {
        self.update(|c| {
            c.multiplier_junior = junior;
            c.multiplier_mid = mid;
            c.multiplier_senior = senior;
        })
    }
}
