use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::host::Host;
use crate::update::component::{ComponentMetadata, derive_basename};

// =============================================================================
// Time-related constants
// =============================================================================

/// Default manifest cache lifetime in seconds (24 hours)
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// Timeout for remote manifest fetches in seconds
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// Updater configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdaterConfig {
    /// The host platform version updates are checked against.
    pub platform_version: String,
    pub cache: CacheConfig,
    pub components: Vec<ComponentConfig>,
}

/// Cache-related configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Manifest cache lifetime in seconds
    pub ttl_secs: u64,
    /// Transient store location; defaults to the data directory
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            path: None,
        }
    }
}

/// One tracked component as declared in the configuration file
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    pub entry: PathBuf,
    pub manifest: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub metadata: ComponentMetadata,
}

fn default_active() -> bool {
    true
}

/// Host implementation backed by the static configuration file.
///
/// Metadata, activation state, and the platform version all come from the
/// declarations the operator wrote down.
pub struct ConfigHost {
    platform_version: String,
    components: Vec<ComponentConfig>,
}

impl ConfigHost {
    pub fn new(config: &UpdaterConfig) -> Self {
        Self {
            platform_version: config.platform_version.clone(),
            components: config.components.clone(),
        }
    }
}

impl Host for ConfigHost {
    fn component_metadata(&self, entry: &Path) -> Option<ComponentMetadata> {
        self.components
            .iter()
            .find(|c| c.entry == entry)
            .map(|c| c.metadata.clone())
    }

    fn is_active(&self, basename: &str) -> bool {
        self.components
            .iter()
            .find(|c| derive_basename(&c.entry) == basename)
            .map(|c| c.active)
            .unwrap_or(false)
    }

    fn platform_version(&self) -> String {
        self.platform_version.clone()
    }
}

/// Returns the path to the data directory for upcheck.
/// Uses $XDG_DATA_HOME/upcheck if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/upcheck,
/// or ./upcheck if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default path to the transient store database.
pub fn db_path() -> PathBuf {
    data_dir().join("transients.db")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("upcheck")
}
