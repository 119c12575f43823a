//! Component records and the in-memory component registry

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::host::Host;
use crate::update::error::RegistrationError;

/// Locally discovered metadata for an installed component.
///
/// Fields mirror what a component declares about itself; empty strings mean
/// "not declared".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentMetadata {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub author_uri: String,
    pub homepage: String,
    /// Minimum platform version the installed component declares.
    pub requires: String,
    /// Minimum runtime version the installed component declares.
    pub requires_runtime: String,
}

impl ComponentMetadata {
    /// The declared platform floor, if any.
    pub fn requires_floor(&self) -> Option<&str> {
        let trimmed = self.requires.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// A host request to track one component for updates.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentRegistration {
    /// Path to the component's entry file.
    pub entry: PathBuf,
    /// Filesystem path or URL of the component's manifest.
    pub manifest: String,
    /// Optional slug override.
    #[serde(default)]
    pub id: Option<String>,
}

/// A registered, active component.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// Install-relative path, the primary key.
    pub basename: String,
    /// Normalized lowercase hyphenated name.
    pub slug: String,
    pub entry: PathBuf,
    pub manifest_location: String,
    pub metadata: ComponentMetadata,
}

impl Component {
    /// The currently installed version.
    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// Directory holding the component's bundled assets (banners etc.).
    pub fn assets_dir(&self) -> PathBuf {
        self.entry
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("assets")
    }
}

/// Field selector for registry lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKey {
    Slug,
    Basename,
}

/// In-memory mapping of basename to component record.
///
/// Registration order is preserved so check output is deterministic.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, Component>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component for update tracking.
    ///
    /// Invalid registrations are logged and dropped, never raised. Inactive
    /// components are dropped silently. Re-registering a basename replaces
    /// the prior entry.
    pub fn register(&mut self, registration: ComponentRegistration, host: &dyn Host) {
        match Self::build_component(&registration, host) {
            Ok(Some(component)) => {
                debug!(
                    "registered component {} ({})",
                    component.basename, component.slug
                );
                self.components
                    .insert(component.basename.clone(), component);
            }
            Ok(None) => {}
            Err(e) => error!("could not register component for updates: {e}"),
        }
    }

    fn build_component(
        registration: &ComponentRegistration,
        host: &dyn Host,
    ) -> Result<Option<Component>, RegistrationError> {
        if registration.manifest.trim().is_empty() {
            return Err(RegistrationError::MissingManifest);
        }
        if registration.entry.as_os_str().is_empty() {
            return Err(RegistrationError::MissingEntry);
        }

        let metadata = host
            .component_metadata(&registration.entry)
            .ok_or_else(|| {
                RegistrationError::InvalidMetadata(format!(
                    "no metadata for entry {:?}",
                    registration.entry
                ))
            })?;

        if metadata.name.trim().is_empty() {
            return Err(RegistrationError::InvalidMetadata(
                "missing required key \"name\"".to_string(),
            ));
        }
        if metadata.version.trim().is_empty() {
            return Err(RegistrationError::InvalidMetadata(
                "missing required key \"version\"".to_string(),
            ));
        }

        let basename = derive_basename(&registration.entry);

        if !host.is_active(&basename) {
            debug!("skipping inactive component {basename}");
            return Ok(None);
        }

        let slug = registration
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| derive_slug(&metadata, &registration.entry));

        Ok(Some(Component {
            basename,
            slug,
            entry: registration.entry.clone(),
            manifest_location: registration.manifest.clone(),
            metadata,
        }))
    }

    /// Linear lookup by field.
    pub fn find(&self, key: ComponentKey, value: &str) -> Option<&Component> {
        self.components.values().find(|component| match key {
            ComponentKey::Slug => component.slug == value,
            ComponentKey::Basename => component.basename == value,
        })
    }

    /// Registered components in registration order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// JSON encoding of the sorted `{basename: version}` map across all
    /// registered components. Sorted so registration order cannot disturb
    /// cache validity.
    pub fn fingerprint(&self) -> String {
        let checked: BTreeMap<&str, &str> = self
            .components
            .values()
            .map(|c| (c.basename.as_str(), c.version()))
            .collect();
        serde_json::to_string(&checked).expect("fingerprint serialization")
    }
}

/// Install-relative identifier: the entry file name qualified by its
/// directory, e.g. `acme-widget/acme-widget.json`.
pub fn derive_basename(entry: &Path) -> String {
    let file = entry
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    match entry.parent().and_then(|p| p.file_name()) {
        Some(dir) => format!("{}/{}", dir.to_string_lossy(), file),
        None => file,
    }
}

fn derive_slug(metadata: &ComponentMetadata, entry: &Path) -> String {
    if !metadata.name.trim().is_empty() {
        return slugify(&metadata.name);
    }
    let stem = entry
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    slugify(&stem)
}

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9]+").expect("valid slug pattern"));

/// Lowercase, collapse non-alphanumeric runs to single hyphens, trim.
pub fn slugify(name: &str) -> String {
    NON_ALNUM
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}
