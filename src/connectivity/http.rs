//! reqwest-backed connectivity
//!
//! Two clients are kept: one following up to 10 redirects and one that
//! never follows them, selected per request from [`FetchOptions`].

use crate::connectivity::{is_html_content_type, sniff_html, Connectivity, FetchOptions, FetchResponse};
use crate::{ImportError, Result};
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client, Response};
use std::time::Duration;

const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with the importer's defaults
///
/// # Arguments
///
/// * `timeout` - Whole-request timeout
/// * `follow_redirects` - Follow up to 10 redirects when true, none otherwise
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout: Duration, follow_redirects: bool) -> reqwest::Result<Client> {
    let policy = if follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(policy)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Connectivity over HTTP(S)
pub struct HttpConnectivity {
    following: Client,
    direct: Client,
}

impl HttpConnectivity {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            following: build_http_client(timeout, true)?,
            direct: build_http_client(timeout, false)?,
        })
    }

    fn client(&self, follow_redirects: bool) -> &Client {
        if follow_redirects {
            &self.following
        } else {
            &self.direct
        }
    }
}

#[async_trait]
impl Connectivity for HttpConnectivity {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse> {
        let response = self
            .client(options.follow_redirects)
            .get(url)
            .header(header::USER_AGENT, options.user_agent.as_str())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if status.is_redirection() && !options.follow_redirects {
            tracing::debug!("Not following redirect from {} ({})", url, status);
            return Ok(FetchResponse {
                status: status.as_u16(),
                final_url,
                document: None,
                is_binary: false,
                content_type,
            });
        }

        if !status.is_success() {
            return Err(ImportError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let document = if options.ignore_content_type {
            read_sniffed(url, response).await?
        } else if content_type.as_deref().is_some_and(is_html_content_type) {
            Some(read_text(url, response).await?)
        } else {
            None
        };

        Ok(FetchResponse {
            status: status.as_u16(),
            final_url,
            is_binary: document.is_none(),
            document,
            content_type,
        })
    }
}

async fn read_text(url: &str, response: Response) -> Result<String> {
    response.text().await.map_err(|e| classify_error(url, e))
}

async fn read_sniffed(url: &str, response: Response) -> Result<Option<String>> {
    let bytes = response.bytes().await.map_err(|e| classify_error(url, e))?;
    if !sniff_html(&bytes) {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

fn classify_error(url: &str, error: reqwest::Error) -> ImportError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_redirect() {
        "Too many redirects".to_string()
    } else {
        error.to_string()
    };

    ImportError::Fetch {
        url: url.to_string(),
        message,
    }
}
