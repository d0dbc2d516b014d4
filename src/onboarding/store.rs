//! "Have I seen onboarding" persistence
//!
//! Read once at startup to decide whether to show the wizard, written once
//! when the user finishes it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{parse_flag, setupflow_home};

/// Bump when the wizard changes enough that existing users should see it
/// again.
pub const CURRENT_ONBOARDING_VERSION: u32 = 1;

/// Env var that marks a declaratively managed install. Such installs never
/// show the wizard.
pub const NIX_MODE_ENV: &str = "SETUPFLOW_NIX_MODE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingRecord {
    #[serde(default)]
    pub seen: bool,
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnboardingRecord {
    /// True when this record says the current wizard was already completed.
    pub fn is_current(&self) -> bool {
        self.seen && self.version >= CURRENT_ONBOARDING_VERSION
    }
}

pub trait OnboardingStore: Send + Sync {
    fn load(&self) -> Result<OnboardingRecord>;
    fn save(&self, record: &OnboardingRecord) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// TOML file store, by default `~/.setupflow/onboarding.toml`.
#[derive(Debug, Clone)]
pub struct FileOnboardingStore {
    path: PathBuf,
}

impl FileOnboardingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Self {
        Self::new(setupflow_home().join("onboarding.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OnboardingStore for FileOnboardingStore {
    /// A missing file is a fresh install, not an error.
    fn load(&self) -> Result<OnboardingRecord> {
        if !self.path.exists() {
            return Ok(OnboardingRecord::default());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read onboarding state: {:?}", self.path))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse onboarding state: {:?}", self.path))
    }

    fn save(&self, record: &OnboardingRecord) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(record).context("Failed to serialize onboarding state")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        fs::write(&self.path, toml_string)
            .with_context(|| format!("Failed to write onboarding state: {:?}", self.path))?;
        tracing::info!("Onboarding state saved to: {:?}", self.path);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove onboarding state: {:?}", self.path)),
        }
    }
}

/// In-process store for embedding hosts that keep their own persistence.
#[derive(Debug, Default)]
pub struct MemoryOnboardingStore {
    record: Mutex<Option<OnboardingRecord>>,
}

impl MemoryOnboardingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: OnboardingRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl OnboardingStore for MemoryOnboardingStore {
    fn load(&self) -> Result<OnboardingRecord> {
        let record = self.record.lock().unwrap_or_else(|e| e.into_inner());
        Ok(record.clone().unwrap_or_default())
    }

    fn save(&self, record: &OnboardingRecord) -> Result<()> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.record.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Whether `SETUPFLOW_NIX_MODE` is set to a truthy value.
pub fn nix_mode_from_env() -> bool {
    std::env::var(NIX_MODE_ENV)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(false)
}

/// Whether the wizard should be shown at startup.
pub fn should_show(store: &dyn OnboardingStore) -> bool {
    should_show_with(store, nix_mode_from_env())
}

/// Managed installs skip onboarding entirely. Otherwise it is shown unless
/// the current version was completed. An unreadable record shows the wizard.
pub fn should_show_with(store: &dyn OnboardingStore, nix_mode: bool) -> bool {
    if nix_mode {
        tracing::debug!("Managed install, skipping onboarding");
        return false;
    }
    match store.load() {
        Ok(record) => !record.is_current(),
        Err(e) => {
            tracing::warn!("Could not read onboarding state, showing wizard: {:#}", e);
            true
        }
    }
}
