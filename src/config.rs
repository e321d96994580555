//! Archive engine configuration
//!
//! Loaded from a JSON file, validated once, immutable afterwards.
//!
//! ```json
//! { "data_dir": "/var/lib/arczone", "max_rename_probes": 1024 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{ArchiveError, ArchiveResult};
use crate::observability::Severity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Data directory holding the journal (required)
    pub data_dir: PathBuf,

    /// Upper bound on rename candidates tried for one bucket retire
    #[serde(default = "default_max_rename_probes")]
    pub max_rename_probes: u64,

    /// Journal sync mode; only "fsync" is accepted
    #[serde(default = "default_journal_sync_mode")]
    pub journal_sync_mode: String,

    /// Minimum log severity
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_rename_probes() -> u64 {
    1024
}

fn default_journal_sync_mode() -> String {
    "fsync".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ArchiveConfig {
    /// Configuration with defaults for everything but the data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_rename_probes: default_max_rename_probes(),
            journal_sync_mode: default_journal_sync_mode(),
            log_level: default_log_level(),
        }
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ArchiveResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ArchiveError::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: ArchiveConfig = serde_json::from_str(&content)
            .map_err(|e| ArchiveError::Config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ArchiveResult<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ArchiveError::Config("data_dir must not be empty".into()));
        }

        if self.max_rename_probes == 0 {
            return Err(ArchiveError::Config("max_rename_probes must be > 0".into()));
        }

        if self.journal_sync_mode != "fsync" {
            return Err(ArchiveError::Config(format!(
                "Invalid journal_sync_mode: '{}'. Only 'fsync' is allowed.",
                self.journal_sync_mode
            )));
        }

        self.log_severity()?;
        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_severity(&self) -> ArchiveResult<Severity> {
        self.log_level.parse().map_err(ArchiveError::Config)
    }
}
