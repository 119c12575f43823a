//! Typed manifest document describing the latest release of one component

use serde::{Deserialize, Serialize};

use crate::update::error::FetchError;

/// A fetched manifest. Every field except `version` is optional; a document
/// without a comparable version is a parse failure, not an empty manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    pub version: String,
    /// Minimum platform version this release runs on.
    #[serde(default)]
    pub requires: Option<String>,
    /// Minimum runtime version. The wire name is historical.
    #[serde(default, rename = "requires_php")]
    pub requires_runtime: Option<String>,
    /// Highest platform version this release was verified against.
    #[serde(default)]
    pub tested: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub download_link: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub author_uri: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub installation: Option<String>,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub upgrade_notice: Option<String>,
    #[serde(default)]
    pub screenshots: Vec<Screenshot>,
    #[serde(default)]
    pub banners: Option<Banners>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub url: String,
    #[serde(default)]
    pub caption: String,
}

/// Banner image URLs by size variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banners {
    #[serde(default)]
    pub low: Option<String>,
    #[serde(default)]
    pub high: Option<String>,
}

impl Manifest {
    /// Parse a manifest body. Empty or non-JSON bodies and documents missing
    /// a usable `version` are all parse failures.
    pub fn parse(body: &str) -> Result<Self, FetchError> {
        if body.trim().is_empty() {
            return Err(FetchError::Parse("empty manifest body".to_string()));
        }

        let manifest: Manifest =
            serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

        if manifest.version.trim().is_empty() {
            return Err(FetchError::Parse(
                "manifest is missing a version".to_string(),
            ));
        }

        Ok(manifest)
    }
}
