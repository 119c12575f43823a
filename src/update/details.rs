//! Composition of the host-facing "view details" record

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use crate::sanitize::{self, Policy};
use crate::update::component::{Component, ComponentMetadata};
use crate::update::manifest::{Banners, Manifest};

/// Banner filenames looked up under a component's assets directory when the
/// manifest carries none. First existing file of each size wins.
const LOCAL_BANNERS_LOW: &[&str] = &["banner-772x250.jpg", "banner-772x250.png"];
const LOCAL_BANNER_HIGH: &str = "banner-1544x500.png";

/// Rich detail record for one component, ready for a host UI to render.
///
/// Pure data: the host decides how (and whether) to display each field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDetails {
    pub slug: String,
    pub name: String,
    pub homepage: String,
    pub version: String,
    pub requires: String,
    pub requires_runtime: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tested: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trunk: Option<String>,
    /// Note reminding the reader that updates come from outside the host's
    /// own directory.
    pub external_host_note: String,
    /// Display sections in tab order (description, upgrade notice,
    /// changelog, installation, screenshots).
    pub sections: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banners: Option<Banners>,
}

/// Builds [`ComponentDetails`] from local metadata and a fetched manifest.
pub struct DetailComposer {
    restrictive: Policy,
    content: Policy,
}

impl Default for DetailComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailComposer {
    pub fn new() -> Self {
        Self {
            restrictive: Policy::restrictive(),
            content: Policy::content(),
        }
    }

    /// Merge local metadata with the remote manifest.
    ///
    /// Local values are the defaults; scalar manifest fields win when
    /// present. Free-text sections are copied from the manifest only when
    /// present and pass through the content sanitizer.
    pub fn compose(&self, component: &Component, manifest: &Manifest) -> ComponentDetails {
        let meta = &component.metadata;

        let mut details = ComponentDetails {
            slug: component.slug.clone(),
            name: meta.name.clone(),
            homepage: meta.homepage.clone(),
            version: meta.version.clone(),
            requires: meta.requires.clone(),
            requires_runtime: meta.requires_runtime.clone(),
            tested: None,
            last_updated: None,
            author: sanitize::sanitize(&meta.author, &self.restrictive),
            download_link: None,
            trunk: None,
            external_host_note: external_host_note(meta),
            sections: IndexMap::new(),
            banners: None,
        };
        details
            .sections
            .insert("description".to_string(), meta.description.clone());

        if let Some(name) = &manifest.name {
            details.name = name.clone();
        }
        details.version = manifest.version.clone();
        if let Some(requires) = &manifest.requires {
            details.requires = requires.clone();
        }
        if let Some(requires_runtime) = &manifest.requires_runtime {
            details.requires_runtime = requires_runtime.clone();
        }
        details.tested = manifest.tested.clone();
        details.last_updated = manifest.last_updated.clone();
        if let Some(homepage) = &manifest.homepage {
            details.homepage = homepage.clone();
        }
        if let Some(link) = &manifest.download_link {
            details.download_link = Some(link.clone());
            details.trunk = Some(link.clone());
        }

        if let Some(author) = &manifest.author {
            details.author = self.compose_author(author, manifest.author_uri.as_deref());
        }

        for (name, text) in [
            ("description", &manifest.description),
            ("upgrade_notice", &manifest.upgrade_notice),
            ("changelog", &manifest.changelog),
            ("installation", &manifest.installation),
        ] {
            if let Some(text) = text {
                details
                    .sections
                    .insert(name.to_string(), sanitize::sanitize(text, &self.content));
            }
        }

        if !manifest.screenshots.is_empty() {
            details.sections.insert(
                "screenshots".to_string(),
                self.compose_screenshots(manifest),
            );
        }

        details.banners = manifest
            .banners
            .clone()
            .or_else(|| local_banners(&component.assets_dir()));

        details
    }

    fn compose_author(&self, author: &str, author_uri: Option<&str>) -> String {
        match author_uri.map(str::trim).filter(|uri| !uri.is_empty()) {
            Some(uri) => format!(
                r#"<a href="{}" target="_blank">{}</a>"#,
                sanitize::escape_attr(uri),
                sanitize::strip_tags(author)
            ),
            None => sanitize::sanitize(author, &self.restrictive),
        }
    }

    fn compose_screenshots(&self, manifest: &Manifest) -> String {
        let mut list = String::from("<ol>");
        for screenshot in &manifest.screenshots {
            let url = sanitize::escape_attr(&screenshot.url);
            let caption = sanitize::sanitize(&screenshot.caption, &self.restrictive);
            let alt = sanitize::strip_tags(&caption);
            list.push_str(&format!(
                r#"<li><a href="{url}" target="_blank"><img src="{url}" alt="{alt}" /></a><p>{caption}</p></li>"#
            ));
        }
        list.push_str("</ol>");
        list
    }
}

fn external_host_note(meta: &ComponentMetadata) -> String {
    format!(
        "This component is maintained by {} and its updates are hosted externally. Source: {}",
        sanitize::strip_tags(&meta.author),
        meta.homepage
    )
}

fn local_banners(assets_dir: &Path) -> Option<Banners> {
    let low = LOCAL_BANNERS_LOW
        .iter()
        .map(|name| assets_dir.join(name))
        .find(|path| path.is_file())
        .map(|path| path.to_string_lossy().into_owned());
    let high = Some(assets_dir.join(LOCAL_BANNER_HIGH))
        .filter(|path| path.is_file())
        .map(|path| path.to_string_lossy().into_owned());

    if low.is_none() && high.is_none() {
        return None;
    }
    Some(Banners { low, high })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn component() -> Component {
        Component {
            basename: "acme-widget/acme-widget.json".to_string(),
            slug: "acme-widget".to_string(),
            entry: PathBuf::from("acme-widget/acme-widget.json"),
            manifest_location: "https://acme.example/manifest.json".to_string(),
            metadata: ComponentMetadata {
                name: "Acme Widget".to_string(),
                version: "1.9".to_string(),
                description: "A local description.".to_string(),
                author: "Acme Inc".to_string(),
                homepage: "https://acme.example/widget".to_string(),
                requires: "5.0".to_string(),
                requires_runtime: "1.70".to_string(),
                ..Default::default()
            },
        }
    }

    fn component_at(entry: PathBuf) -> Component {
        Component {
            entry,
            ..component()
        }
    }

    fn manifest(value: serde_json::Value) -> Manifest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn compose_uses_local_metadata_for_sparse_manifest() {
        let composer = DetailComposer::new();
        let details = composer.compose(&component(), &manifest(json!({ "version": "1.10" })));

        assert_eq!(details.slug, "acme-widget");
        assert_eq!(details.name, "Acme Widget");
        assert_eq!(details.homepage, "https://acme.example/widget");
        assert_eq!(details.version, "1.10");
        assert_eq!(details.requires, "5.0");
        assert_eq!(details.author, "Acme Inc");
        assert_eq!(
            details.sections.get("description").unwrap(),
            "A local description."
        );
        assert_eq!(details.download_link, None);
        assert_eq!(details.banners, None);
    }

    #[test]
    fn compose_overlays_remote_scalar_fields() {
        let composer = DetailComposer::new();
        let details = composer.compose(
            &component(),
            &manifest(json!({
                "name": "Acme Widget Pro",
                "version": "2.0",
                "requires": "5.5",
                "requires_php": "8.0",
                "tested": "5.8",
                "last_updated": "2021-06-01",
                "homepage": "https://acme.example/pro",
                "download_link": "https://acme.example/widget-2.0.zip"
            })),
        );

        assert_eq!(details.name, "Acme Widget Pro");
        assert_eq!(details.version, "2.0");
        assert_eq!(details.requires, "5.5");
        assert_eq!(details.requires_runtime, "8.0");
        assert_eq!(details.tested.as_deref(), Some("5.8"));
        assert_eq!(details.last_updated.as_deref(), Some("2021-06-01"));
        assert_eq!(details.homepage, "https://acme.example/pro");
        assert_eq!(
            details.download_link.as_deref(),
            Some("https://acme.example/widget-2.0.zip")
        );
        assert_eq!(details.trunk, details.download_link);
    }

    #[test]
    fn compose_renders_author_link_when_uri_present() {
        let composer = DetailComposer::new();
        let details = composer.compose(
            &component(),
            &manifest(json!({
                "version": "1.10",
                "author": "<b>Acme</b> Inc",
                "author_uri": "https://acme.example"
            })),
        );

        assert_eq!(
            details.author,
            r#"<a href="https://acme.example" target="_blank">Acme Inc</a>"#
        );
    }

    #[test]
    fn compose_sanitizes_author_without_uri() {
        let composer = DetailComposer::new();
        let details = composer.compose(
            &component(),
            &manifest(json!({
                "version": "1.10",
                "author": "<script>alert(1)</script><b>Acme</b>"
            })),
        );

        assert!(!details.author.contains("<script"));
        assert_eq!(details.author, "alert(1)<b>Acme</b>");
    }

    #[test]
    fn compose_sanitizes_free_text_sections() {
        let composer = DetailComposer::new();
        let details = composer.compose(
            &component(),
            &manifest(json!({
                "version": "1.10",
                "description": "<p>Good</p><script>alert(1)</script>",
                "changelog": "<h4>1.10</h4><ul><li>Fix</li></ul>"
            })),
        );

        let description = details.sections.get("description").unwrap();
        assert!(!description.contains("<script"));
        assert_eq!(description, "<p>Good</p>alert(1)");
        assert_eq!(
            details.sections.get("changelog").unwrap(),
            "<h4>1.10</h4><ul><li>Fix</li></ul>"
        );
        assert!(!details.sections.contains_key("installation"));
    }

    #[test]
    fn compose_renders_screenshots_as_ordered_list() {
        let composer = DetailComposer::new();
        let details = composer.compose(
            &component(),
            &manifest(json!({
                "version": "1.10",
                "screenshots": [
                    { "url": "https://acme.example/one.png", "caption": "<em>Main</em> view" }
                ]
            })),
        );

        let section = details.sections.get("screenshots").unwrap();
        assert!(section.starts_with("<ol>"));
        assert!(section.ends_with("</ol>"));
        assert!(section.contains(r#"<img src="https://acme.example/one.png" alt="Main view" />"#));
        assert!(section.contains("<p><em>Main</em> view</p>"));
    }

    #[test]
    fn compose_prefers_remote_banners() {
        let temp_dir = TempDir::new().unwrap();
        let assets = temp_dir.path().join("assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("banner-772x250.png"), b"png").unwrap();

        let composer = DetailComposer::new();
        let details = composer.compose(
            &component_at(temp_dir.path().join("acme-widget.json")),
            &manifest(json!({
                "version": "1.10",
                "banners": { "low": "https://acme.example/low.png", "high": "https://acme.example/high.png" }
            })),
        );

        let banners = details.banners.unwrap();
        assert_eq!(banners.low.as_deref(), Some("https://acme.example/low.png"));
        assert_eq!(banners.high.as_deref(), Some("https://acme.example/high.png"));
    }

    #[test]
    fn compose_falls_back_to_local_banners() {
        let temp_dir = TempDir::new().unwrap();
        let assets = temp_dir.path().join("assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("banner-772x250.jpg"), b"jpg").unwrap();
        std::fs::write(assets.join("banner-772x250.png"), b"png").unwrap();
        std::fs::write(assets.join("banner-1544x500.png"), b"png").unwrap();

        let composer = DetailComposer::new();
        let details = composer.compose(
            &component_at(temp_dir.path().join("acme-widget.json")),
            &manifest(json!({ "version": "1.10" })),
        );

        let banners = details.banners.unwrap();
        // First existing low-size candidate wins.
        assert!(banners.low.unwrap().ends_with("banner-772x250.jpg"));
        assert!(banners.high.unwrap().ends_with("banner-1544x500.png"));
    }

    #[test]
    fn compose_is_idempotent() {
        let composer = DetailComposer::new();
        let component = component();
        let manifest = manifest(json!({
            "version": "1.10",
            "author": "Acme",
            "description": "<p>Widgets</p>",
            "screenshots": [{ "url": "https://x/s.png", "caption": "view" }]
        }));

        let first = composer.compose(&component, &manifest);
        let second = composer.compose(&component, &manifest);

        assert_eq!(first, second);
    }
}
