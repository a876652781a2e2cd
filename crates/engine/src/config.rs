//! Repository configuration via TOML
//!
//! Every field has a default, so an empty document is a valid configuration.

use std::path::Path;
use std::time::Duration;

use keybranch_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// What hydration does with an indexed id that has no primary record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingRecordPolicy {
    /// Leave it out of the result and log a warning
    #[default]
    Skip,
    /// Fail the query with `Error::RecordNotFound`
    Error,
}

/// Repository configuration
///
/// # Example
///
/// ```toml
/// evict_stale_entries = true
/// missing_record_policy = "skip"
/// assign_missing_ids = true
/// # default_ttl_secs = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// On update, remove the id from branch keys the previous version of
    /// the entity mapped to and the new version no longer does
    #[serde(default = "default_true")]
    pub evict_stale_entries: bool,
    /// Handling of indexed ids without a primary record
    #[serde(default)]
    pub missing_record_policy: MissingRecordPolicy,
    /// Expiry applied to every key of an entity right after `add`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ttl_secs: Option<u64>,
    /// Give entities added with an empty id a fresh UUID
    #[serde(default = "default_true")]
    pub assign_missing_ids: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            evict_stale_entries: true,
            missing_record_policy: MissingRecordPolicy::Skip,
            default_ttl_secs: None,
            assign_missing_ids: true,
        }
    }
}

impl RepositoryConfig {
    /// `default_ttl_secs` as a duration
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# keybranch repository configuration
#
# Remove an entity from branch keys its previous version mapped to when an
# update moves it elsewhere (default: true)
evict_stale_entries = true

# Indexed id without a primary record during a query: "skip" (default) or "error"
missing_record_policy = "skip"

# Assign a UUID to entities added with an empty id (default: true)
assign_missing_ids = true

# Expire every key of an entity this many seconds after it is added
# default_ttl_secs = 3600
"#
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse repository config: {}", e)))
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
