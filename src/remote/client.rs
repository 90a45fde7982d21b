//! Download service HTTP client

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::models::*;
use super::CatalogApi;
use crate::track::ReferenceKind;

/// Default service endpoint
pub const DEFAULT_API_URL: &str = "https://api.spotifydown.com";

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0";
const SITE_ORIGIN: &str = "https://spotifydown.com";

/// HTTP client for the download service
#[derive(Clone)]
pub struct DownloaderClient {
    base_url: String,
    http_client: Client,
}

impl DownloaderClient {
    /// Create a new client for the service at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        // The service and its CDN only answer requests that look like they
        // come from the web front end.
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.5"),
        );
        headers.insert(
            header::REFERER,
            HeaderValue::from_str(&format!("{}/", SITE_ORIGIN))
                .context("Invalid referer header")?,
        );
        headers.insert(header::ORIGIN, HeaderValue::from_static(SITE_ORIGIN));
        headers.insert(header::DNT, HeaderValue::from_static("1"));

        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    fn metadata_url(&self, kind: ReferenceKind, id: &str) -> String {
        format!(
            "{}/metadata/{}/{}",
            self.base_url,
            kind.as_str(),
            urlencoding::encode(id)
        )
    }

    fn track_list_url(&self, kind: ReferenceKind, id: &str, offset: Option<&str>) -> String {
        let url = format!(
            "{}/trackList/{}/{}",
            self.base_url,
            kind.as_str(),
            urlencoding::encode(id)
        );
        match offset {
            Some(offset) => format!("{}?offset={}", url, urlencoding::encode(offset)),
            None => url,
        }
    }

    fn download_url(&self, track_id: &str, token: &str) -> String {
        format!(
            "{}/download/{}?token={}",
            self.base_url,
            urlencoding::encode(track_id),
            urlencoding::encode(token)
        )
    }

    /// GET a JSON document, parsing the body whatever the HTTP status
    ///
    /// The service reports failures as `{"success": false, ...}` bodies,
    /// often with a 4xx status.
    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", what))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read {} response", what))?;

        serde_json::from_slice(&body)
            .with_context(|| format!("Failed to parse {} response (status {})", what, status))
    }
}

#[async_trait]
impl CatalogApi for DownloaderClient {
    async fn entity_metadata(&self, kind: ReferenceKind, id: &str) -> Result<EntityMetadata> {
        let url = self.metadata_url(kind, id);
        debug!("Fetching {} metadata: {}", kind, url);
        self.get_json(&url, "metadata").await
    }

    async fn track_metadata(&self, id: &str) -> Result<TrackMetadata> {
        let url = self.metadata_url(ReferenceKind::Track, id);
        debug!("Fetching track metadata: {}", url);
        self.get_json(&url, "track metadata").await
    }

    async fn track_list_page(
        &self,
        kind: ReferenceKind,
        id: &str,
        offset: Option<&str>,
    ) -> Result<TrackListPage> {
        let url = self.track_list_url(kind, id, offset);
        debug!("Fetching {} track list: {}", kind, url);
        self.get_json(&url, "track list").await
    }

    async fn download_link(&self, track_id: &str, token: &str) -> Result<DownloadLink> {
        // Never log the token itself
        debug!("Requesting download link for track {}", track_id);
        let url = self.download_url(track_id, token);
        self.get_json(&url, "download link").await
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Bytes> {
        debug!("Downloading {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("Failed to connect")?;

        if !response.status().is_success() {
            anyhow::bail!("Bad download response: {}", response.status());
        }

        response
            .bytes()
            .await
            .context("Failed to read download response")
    }
}
