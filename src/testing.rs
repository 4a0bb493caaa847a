//! Shared fixtures for unit tests

use crate::commit::CommitDispatcher;
use crate::connectivity::{Connectivity, DownloadOutcome, Downloader, FetchOptions, FetchResponse};
use crate::content::PageContent;
use crate::joblog::MemoryLog;
use crate::pipeline::{CancellationFlag, ImportContext, ImportPrincipal, ImportServices, SiteHandle};
use crate::queue::SiteQueue;
use crate::repository::SqliteRepository;
use crate::{ImportError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Serves canned HTML documents and counts fetches per URL
#[derive(Default)]
pub struct StaticConnectivity {
    pages: HashMap<String, String>,
    fetches: Mutex<HashMap<String, usize>>,
    latency: Option<Duration>,
}

impl StaticConnectivity {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Every fetch sleeps for `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Connectivity for StaticConnectivity {
    async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<FetchResponse> {
        *self.fetches.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.pages.get(url) {
            Some(html) => Ok(FetchResponse {
                status: 200,
                final_url: url.to_string(),
                document: Some(html.clone()),
                is_binary: false,
                content_type: Some("text/html".to_string()),
            }),
            None => Err(ImportError::FetchStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Reports every item as downloaded and remembers each batch
#[derive(Default)]
pub struct RecordingDownloader {
    pub batches: Mutex<Vec<BTreeMap<String, String>>>,
}

#[async_trait]
impl Downloader for RecordingDownloader {
    async fn download_batch(
        &self,
        items: &BTreeMap<String, String>,
        _as_asset_binaries: bool,
    ) -> Vec<DownloadOutcome> {
        self.batches.lock().unwrap().push(items.clone());
        items
            .iter()
            .map(|(remote, target)| DownloadOutcome {
                succeeded: true,
                target: target.clone(),
                remote_url: remote.clone(),
                content_type: None,
            })
            .collect()
    }
}

pub fn services(repo: Arc<SqliteRepository>) -> ImportServices {
    services_with(
        repo,
        Arc::new(StaticConnectivity::default()),
        Arc::new(RecordingDownloader::default()),
    )
}

pub fn services_with(
    repo: Arc<SqliteRepository>,
    connectivity: Arc<dyn Connectivity>,
    downloader: Arc<dyn Downloader>,
) -> ImportServices {
    ImportServices::from_repository(repo, connectivity, downloader)
}

/// Context with synchronous commits against `services`
pub fn context(site: &str, services: &ImportServices) -> ImportContext {
    ImportContext::new(
        ImportPrincipal {
            user: "tester".to_string(),
            job_id: "job-test".to_string(),
        },
        SiteHandle::new(site),
        Url::parse("http://example.com/").unwrap(),
        3,
        CancellationFlag::new(),
        Arc::new(MemoryLog::new()),
        Arc::new(SiteQueue::new(site)),
        Arc::new(CommitDispatcher::new(services.clone(), 1, true)),
    )
}

pub fn seed_content() -> PageContent {
    PageContent::new(
        Url::parse("http://example.com/").unwrap(),
        "<html><head><title>Home</title></head><body><p>Home</p></body></html>",
    )
}

pub fn page_and_context(site: &str) -> (PageContent, ImportContext) {
    let repo = Arc::new(SqliteRepository::in_memory().unwrap());
    let ctx = context(site, &services(repo));
    (seed_content(), ctx)
}
