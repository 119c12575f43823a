//! Manifest retrieval from local paths and remote URLs

use std::path::Path;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use tracing::warn;

use crate::config::FETCH_TIMEOUT_SECS;
use crate::update::error::FetchError;
use crate::update::manifest::Manifest;

/// Trait for retrieving a manifest document from a location
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ManifestSource: Send + Sync {
    /// Fetch and parse the manifest at `location`.
    ///
    /// # Arguments
    /// * `location` - A filesystem path or an HTTP(S) URL
    ///
    /// # Returns
    /// * `Ok(Manifest)` - The parsed manifest document
    /// * `Err(FetchError)` - Transport, HTTP, or parse failure
    async fn fetch(&self, location: &str) -> Result<Manifest, FetchError>;
}

/// Default manifest source: local files are read synchronously, URLs are
/// fetched with a bounded timeout. No retries; the next cache-expiry cycle
/// is the retry policy.
pub struct ManifestFetcher {
    client: reqwest::Client,
}

impl ManifestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("upcheck")
                .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for ManifestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ManifestSource for ManifestFetcher {
    async fn fetch(&self, location: &str) -> Result<Manifest, FetchError> {
        if Path::new(location).is_file() {
            let body = std::fs::read_to_string(location)?;
            return Manifest::parse(&body);
        }

        let response = self
            .client
            .get(location)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("manifest host returned status {} for {}", status, location);
            return Err(FetchError::Http {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }

        let body = response.text().await?;
        Manifest::parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::io::Write;

    #[tokio::test]
    async fn fetch_parses_remote_manifest() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/manifest.json")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"version": "1.10", "download_link": "https://x/y.zip"}"#)
            .create_async()
            .await;

        let fetcher = ManifestFetcher::new();
        let manifest = fetcher
            .fetch(&format!("{}/manifest.json", server.url()))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(manifest.version, "1.10");
        assert_eq!(manifest.download_link.as_deref(), Some("https://x/y.zip"));
    }

    #[tokio::test]
    async fn fetch_classifies_http_error_status() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/manifest.json")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let fetcher = ManifestFetcher::new();
        let result = fetcher
            .fetch(&format!("{}/manifest.json", server.url()))
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::Http { status: 500, .. })));
    }

    #[tokio::test]
    async fn fetch_classifies_not_found_as_http_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/missing.json")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = ManifestFetcher::new();
        let result = fetcher.fetch(&format!("{}/missing.json", server.url())).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::Http { status: 404, .. })));
    }

    #[tokio::test]
    async fn fetch_classifies_invalid_json_as_parse_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/manifest.json")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let fetcher = ManifestFetcher::new();
        let result = fetcher
            .fetch(&format!("{}/manifest.json", server.url()))
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn fetch_classifies_empty_body_as_parse_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/manifest.json")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let fetcher = ManifestFetcher::new();
        let result = fetcher
            .fetch(&format!("{}/manifest.json", server.url()))
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn fetch_reads_local_manifest_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{"version": "3.2.1"}}"#).unwrap();

        let fetcher = ManifestFetcher::new();
        let manifest = fetcher.fetch(&path.to_string_lossy()).await.unwrap();

        assert_eq!(manifest.version, "3.2.1");
    }

    #[tokio::test]
    async fn fetch_rejects_local_file_without_version() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, r#"{"name": "Acme"}"#).unwrap();

        let fetcher = ManifestFetcher::new();
        let result = fetcher.fetch(&path.to_string_lossy()).await;

        assert!(matches!(result, Err(FetchError::Parse(_))));
    }
}
