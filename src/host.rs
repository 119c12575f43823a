//! Host-environment interface

use std::path::Path;

#[cfg(test)]
use mockall::automock;

use crate::update::component::ComponentMetadata;

/// What the embedding host must answer about its environment.
///
/// The update core never reaches into host globals; the composition root
/// decides where component metadata, activation state, and the platform
/// version come from and passes one of these in.
#[cfg_attr(test, automock)]
pub trait Host: Send + Sync {
    /// Local metadata for the component rooted at `entry`, if discoverable.
    fn component_metadata(&self, entry: &Path) -> Option<ComponentMetadata>;

    /// Whether the component is currently active in the host.
    fn is_active(&self, basename: &str) -> bool;

    /// The platform version updates are checked against.
    fn platform_version(&self) -> String;
}
