//! Fingerprint- and TTL-gated manifest cache

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::update::component::Component;
use crate::update::error::FetchError;
use crate::update::fetcher::ManifestSource;
use crate::update::manifest::Manifest;
use crate::update::store::TransientStore;

/// One cached fetch result for a component.
///
/// The fingerprint records the versions of every registered component at
/// fetch time; a mismatch invalidates the entry even inside the TTL window,
/// so a component-set change never serves a stale determination.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub fetched_at: DateTime<Utc>,
    pub manifest: Manifest,
}

/// Per-component manifest cache in front of a [`ManifestSource`].
pub struct ManifestCache {
    store: Arc<dyn TransientStore>,
    source: Arc<dyn ManifestSource>,
    ttl: Duration,
}

impl ManifestCache {
    pub fn new(
        store: Arc<dyn TransientStore>,
        source: Arc<dyn ManifestSource>,
        ttl: Duration,
    ) -> Self {
        Self { store, source, ttl }
    }

    fn entry_key(component: &Component) -> String {
        format!("component_manifest_{}", component.basename)
    }

    /// Return the component's manifest, fetching through the source when the
    /// cache holds no valid entry or `force` is set.
    ///
    /// A fetch failure propagates to the caller and leaves any previously
    /// cached entry in place; the stale entry is not served in its stead.
    /// Store failures are logged and degrade to a miss or a skipped
    /// write-back, never to an error.
    pub async fn get_or_fetch(
        &self,
        component: &Component,
        fingerprint: &str,
        force: bool,
    ) -> Result<Manifest, FetchError> {
        let key = Self::entry_key(component);

        if !force {
            if let Some(manifest) = self.read_valid(&key, fingerprint) {
                return Ok(manifest);
            }
        }

        let manifest = self.source.fetch(&component.manifest_location).await?;
        self.write_back(&key, fingerprint, &manifest);
        Ok(manifest)
    }

    fn read_valid(&self, key: &str, fingerprint: &str) -> Option<Manifest> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("transient store read failed for {key}: {e}");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("discarding unreadable cache entry {key}: {e}");
                return None;
            }
        };

        if entry.fingerprint != fingerprint {
            debug!("cache entry {key} has a stale fingerprint, refetching");
            return None;
        }

        debug!("using manifest for {key} cached at {}", entry.fetched_at);
        Some(entry.manifest)
    }

    fn write_back(&self, key: &str, fingerprint: &str, manifest: &Manifest) {
        let entry = CacheEntry {
            fingerprint: fingerprint.to_string(),
            fetched_at: Utc::now(),
            manifest: manifest.clone(),
        };

        match serde_json::to_string(&entry) {
            Ok(raw) => {
                if let Err(e) = self.store.set(key, &raw, self.ttl) {
                    warn!("transient store write failed for {key}: {e}");
                }
            }
            Err(e) => warn!("could not serialize cache entry {key}: {e}"),
        }
    }
}
