use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Site-Import
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub importer: ImporterConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Import pipeline behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ImporterConfig {
    /// How many link hops below the seed page are crawled
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Whether HTTP redirects are followed when fetching pages
    #[serde(rename = "follow-redirects", default = "default_true")]
    pub follow_redirects: bool,

    /// Run page commits on the crawl task instead of the worker pool
    #[serde(rename = "synchronous-commits", default)]
    pub synchronous_commits: bool,

    /// Upper bound on concurrently running commit workers
    #[serde(rename = "max-commit-workers", default = "default_commit_workers")]
    pub max_commit_workers: u32,

    /// How long the thumbnail stage waits for outstanding commits (milliseconds)
    #[serde(rename = "commit-drain-timeout-ms", default = "default_drain_timeout")]
    pub commit_drain_timeout_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ImporterConfig {
    pub fn commit_drain_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_drain_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            follow_redirects: true,
            synchronous_commits: false,
            max_commit_workers: default_commit_workers(),
            commit_drain_timeout_ms: default_drain_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_max_depth() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_commit_workers() -> u32 {
    4
}

fn default_drain_timeout() -> u64 {
    30_000
}

fn default_request_timeout() -> u64 {
    30
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the importer
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the importer
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the importer
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for importer-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: Name/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite content repository
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the markdown import report
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}
