//! Connectivity module: everything that talks to the remote site
//!
//! - [`Connectivity`] fetches one URL and classifies the response as an
//!   HTML document or a binary payload
//! - [`Downloader`] fetches a batch of assets and stores them in the
//!   repository in one invocation

mod downloader;
mod http;

pub use downloader::{DownloadOutcome, Downloader, HttpDownloader};
pub use http::{build_http_client, HttpConnectivity};

use crate::Result;
use async_trait::async_trait;

/// Per-request fetch settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Decide HTML versus binary by sniffing the body instead of the header
    pub ignore_content_type: bool,
    pub follow_redirects: bool,
    pub user_agent: String,
}

/// What a fetch produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
    /// Document source when the response was HTML
    pub document: Option<String>,
    pub is_binary: bool,
    pub content_type: Option<String>,
}

impl FetchResponse {
    pub fn is_html(&self) -> bool {
        self.document.is_some()
    }
}

/// Fetches remote URLs
///
/// Non-2xx responses are errors (`ImportError::FetchStatus`), except an
/// unfollowed redirect which is returned with no document.
#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse>;
}

/// Content types treated as HTML documents
pub(crate) fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

/// Guesses whether a body is an HTML document from its first bytes
pub(crate) fn sniff_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(512)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    let text = text.trim_start_matches('\u{feff}').trim_start().to_ascii_lowercase();
    text.starts_with("<!doctype html") || text.starts_with("<html") || text.starts_with("<head")
}
