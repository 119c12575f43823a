//! Update resolution across the registered components

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::host::Host;
use crate::update::cache::ManifestCache;
use crate::update::component::{
    Component, ComponentKey, ComponentRegistration, ComponentRegistry,
};
use crate::update::details::{ComponentDetails, DetailComposer};
use crate::update::manifest::Manifest;
use crate::update::vercmp::{self, CompareResult};

/// Update metadata for one component, consumed by the host UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateDescriptor {
    pub basename: String,
    pub slug: String,
    pub new_version: String,
    pub download_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tested: Option<String>,
}

/// Resolves which registered components have an update available.
///
/// Constructed once by the host's composition root and passed to callers
/// explicitly; there is no global instance.
pub struct UpdateResolver {
    registry: ComponentRegistry,
    cache: ManifestCache,
    composer: DetailComposer,
    host: Arc<dyn Host>,
}

impl UpdateResolver {
    pub fn new(cache: ManifestCache, host: Arc<dyn Host>) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            cache,
            composer: DetailComposer::new(),
            host,
        }
    }

    /// Register a component for update tracking. Invalid registrations are
    /// logged and dropped, never raised.
    pub fn register(&mut self, registration: ComponentRegistration) {
        self.registry.register(registration, self.host.as_ref());
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Check every registered component against its manifest.
    ///
    /// A fetch failure skips the affected component for this cycle; the
    /// check itself never fails. Manifests are fetched concurrently, which
    /// changes nothing observable besides wall-clock time.
    pub async fn list_updates(&self, force: bool) -> Vec<UpdateDescriptor> {
        let fingerprint = self.registry.fingerprint();
        let platform = self.host.platform_version();

        let fingerprint = &fingerprint;
        let results = join_all(self.registry.components().map(|component| async move {
            let result = self.cache.get_or_fetch(component, fingerprint, force).await;
            (component, result)
        }))
        .await;

        let mut updates = Vec::new();
        for (component, result) in results {
            match result {
                Ok(manifest) => {
                    if let Some(descriptor) = self.evaluate(component, &manifest, &platform) {
                        updates.push(descriptor);
                    }
                }
                Err(e) => error!("update check failed for {}: {e}", component.basename),
            }
        }
        updates
    }

    /// Details for the component registered under `slug`, or `None` when the
    /// component is unknown or its manifest cannot be retrieved. Callers
    /// surface a generic message, never the underlying fetch error.
    pub async fn get_details(&self, slug: &str, force: bool) -> Option<ComponentDetails> {
        let component = self.registry.find(ComponentKey::Slug, slug)?;
        let fingerprint = self.registry.fingerprint();

        match self.cache.get_or_fetch(component, &fingerprint, force).await {
            Ok(manifest) => Some(self.composer.compose(component, &manifest)),
            Err(e) => {
                error!(
                    "could not read component info from {}: {e}",
                    component.manifest_location
                );
                None
            }
        }
    }

    fn evaluate(
        &self,
        component: &Component,
        manifest: &Manifest,
        platform: &str,
    ) -> Option<UpdateDescriptor> {
        if vercmp::compare_versions(component.version(), &manifest.version)
            != CompareResult::Outdated
        {
            debug!(
                "{} is up to date ({} vs {})",
                component.basename,
                component.version(),
                manifest.version
            );
            return None;
        }

        let floor = manifest
            .requires
            .as_deref()
            .or_else(|| component.metadata.requires_floor());
        if !vercmp::floor_satisfied(floor, platform) {
            debug!(
                "{} {} requires platform {:?}, have {}",
                component.basename, manifest.version, floor, platform
            );
            return None;
        }

        let Some(download_link) = manifest.download_link.clone() else {
            warn!(
                "manifest for {} offers {} but carries no download link",
                component.basename, manifest.version
            );
            return None;
        };

        Some(UpdateDescriptor {
            basename: component.basename.clone(),
            slug: component.slug.clone(),
            new_version: manifest.version.clone(),
            download_link,
            tested: manifest.tested.clone(),
        })
    }
}
