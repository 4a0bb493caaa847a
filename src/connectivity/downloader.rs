use crate::connectivity::build_http_client;
use crate::repository::AssetStore;
use crate::{ImportError, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Result of one item of a download batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub succeeded: bool,
    /// Repository path the item was (or would have been) stored at
    pub target: String,
    pub remote_url: String,
    pub content_type: Option<String>,
}

/// Fetches a batch of assets in one invocation
#[async_trait]
pub trait Downloader: Send + Sync {
    /// # Arguments
    ///
    /// * `items` - Remote URL to repository path
    /// * `as_asset_binaries` - Store payloads as raw binaries; when false
    ///   each payload must be UTF-8 text
    async fn download_batch(
        &self,
        items: &BTreeMap<String, String>,
        as_asset_binaries: bool,
    ) -> Vec<DownloadOutcome>;
}

/// Downloads over HTTP and stores through an [`AssetStore`]
pub struct HttpDownloader {
    client: Client,
    assets: Arc<dyn AssetStore>,
    user_agent: String,
}

impl HttpDownloader {
    pub fn new(
        assets: Arc<dyn AssetStore>,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_http_client(timeout, true)?,
            assets,
            user_agent: user_agent.into(),
        })
    }

    async fn download_one(
        &self,
        remote_url: &str,
        target: &str,
        as_asset_binaries: bool,
    ) -> Result<Option<String>> {
        let response = self
            .client
            .get(remote_url)
            .header(header::USER_AGENT, self.user_agent.as_str())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImportError::FetchStatus {
                url: remote_url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response.bytes().await?;

        if !as_asset_binaries && std::str::from_utf8(&data).is_err() {
            return Err(ImportError::Fetch {
                url: remote_url.to_string(),
                message: "expected a text payload".to_string(),
            });
        }

        let stored_type = content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        self.assets
            .store_asset(target, remote_url, &stored_type, &data)
            .await?;

        Ok(content_type)
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download_batch(
        &self,
        items: &BTreeMap<String, String>,
        as_asset_binaries: bool,
    ) -> Vec<DownloadOutcome> {
        let mut outcomes = Vec::with_capacity(items.len());

        for (remote_url, target) in items {
            let outcome = match self.download_one(remote_url, target, as_asset_binaries).await {
                Ok(content_type) => {
                    tracing::debug!("Downloaded {} to {}", remote_url, target);
                    DownloadOutcome {
                        succeeded: true,
                        target: target.clone(),
                        remote_url: remote_url.clone(),
                        content_type,
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to download {}: {}", remote_url, e);
                    DownloadOutcome {
                        succeeded: false,
                        target: target.clone(),
                        remote_url: remote_url.clone(),
                        content_type: None,
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
