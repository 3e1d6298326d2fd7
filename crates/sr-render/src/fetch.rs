//! Resolving an asset location to its bytes.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;

use sr_core::config::FetchConfig;
use sr_core::{Error, Result};

/// Turns a location string into bytes. One attempt per call; callers decide
/// what a failure means.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Bytes>;
}

/// Fetcher for every location form the catalog stores: `data:` URIs,
/// `http(s)://` URLs, `file://` URLs and bare filesystem paths.
pub struct LocationFetcher {
    client: reqwest::Client,
}

impl LocationFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Self::new(Duration::from_secs(config.timeout_secs))
    }

    async fn fetch_http(&self, url: &str) -> Result<Bytes> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::fetch(url, format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::fetch(url, e.to_string()))?;
        resp.bytes()
            .await
            .map_err(|e| Error::fetch(url, format!("failed to read body: {e}")))
    }
}

#[async_trait]
impl SourceFetcher for LocationFetcher {
    async fn fetch(&self, location: &str) -> Result<Bytes> {
        if location.starts_with("data:") {
            return decode_data_uri(location);
        }
        if location.starts_with("http://") || location.starts_with("https://") {
            return self.fetch_http(location).await;
        }
        let path = location.strip_prefix("file://").unwrap_or(location);
        tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|e| Error::fetch(location, e.to_string()))
    }
}

/// Decode `data:[<mime>][;base64],<payload>`.
pub fn decode_data_uri(uri: &str) -> Result<Bytes> {
    let short = || uri.chars().take(48).collect::<String>();
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::fetch(short(), "not a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::fetch(short(), "data URI has no payload"))?;

    if meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        STANDARD
            .decode(payload.trim())
            .map(Bytes::from)
            .map_err(|e| Error::fetch(short(), format!("invalid base64: {e}")))
    } else {
        Ok(Bytes::copy_from_slice(payload.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn base64_data_uri() {
        let bytes = decode_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[test]
    fn plain_data_uri() {
        let bytes = decode_data_uri("data:text/plain,hi").unwrap();
        assert_eq!(&bytes[..], b"hi");
    }

    #[test]
    fn malformed_data_uri() {
        assert_matches!(decode_data_uri("data:image/png;base64"), Err(Error::Fetch { .. }));
        assert_matches!(
            decode_data_uri("data:image/png;base64,@@@"),
            Err(Error::Fetch { .. })
        );
    }

    #[tokio::test]
    async fn reads_paths_and_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.bin");
        std::fs::write(&path, b"bytes").unwrap();

        let fetcher = LocationFetcher::new(Duration::from_secs(1)).unwrap();
        let plain = fetcher.fetch(path.to_str().unwrap()).await.unwrap();
        let url = fetcher
            .fetch(&format!("file://{}", path.display()))
            .await
            .unwrap();
        assert_eq!(plain, url);
        assert_eq!(&plain[..], b"bytes");
    }

    #[tokio::test]
    async fn missing_file_is_fetch_error() {
        let fetcher = LocationFetcher::new(Duration::from_secs(1)).unwrap();
        assert_matches!(
            fetcher.fetch("/nonexistent/storyreel/clip.mp4").await,
            Err(Error::Fetch { .. })
        );
    }
}
