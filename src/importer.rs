//! Site importer - one import job from seed URL to finished site
//!
//! This module ties the pieces together for a single job:
//! - Wiring the repository and HTTP collaborators
//! - Fetching the seed page and running the seed pipeline over it
//! - Waiting for background commits before reporting
//! - Releasing the site queue and persisting the summary

use crate::commit::CommitDispatcher;
use crate::config::Config;
use crate::connectivity::{HttpConnectivity, HttpDownloader};
use crate::content::PageContent;
use crate::joblog::{LogMessage, MemoryLog};
use crate::pipeline::{
    CancellationFlag, ImportContext, ImportPrincipal, ImportServices, PipelineOutcome,
    PipelineRunner, SiteHandle, StageTiming,
};
use crate::queue::{SiteQueue, SiteQueueRegistry, SiteRegistration};
use crate::repository::SqliteRepository;
use crate::stages::{seed_pipeline, LinkSettings};
use crate::url::normalize_url;
use crate::{ImportError, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use url::Url;

/// What to import and on whose behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub seed_url: String,
    pub site_name: String,
    pub user: String,
}

/// How an import job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Completed,
    /// A mandatory stage failed; the site was rolled back
    Failed { stage: String, message: String },
    Canceled,
}

impl ImportOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Failed { stage, message } => write!(f, "failed in {}: {}", stage, message),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

/// Result of one import job
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub job_id: String,
    pub site_name: String,
    pub seed_url: String,
    pub user: String,
    pub outcome: ImportOutcome,
    pub stats: BTreeMap<String, u64>,
    pub pages_imported: usize,
    /// Pages whose commit had not finished when the job reported
    pub pages_pending: usize,
    pub commits_drained: bool,
    pub timings: Vec<StageTiming>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub log: Vec<LogMessage>,
}

impl ImportSummary {
    pub fn stat(&self, category: &str) -> u64 {
        self.stats.get(category).copied().unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Stops the jobs currently running on a [`SiteImporter`]
///
/// Every job gets its own [`CancellationFlag`]; canceling reaches only jobs
/// that are running at that moment, later imports start uncanceled.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    jobs: Arc<DashMap<String, CancellationFlag>>,
}

impl CancelHandle {
    /// Cancels every running job and returns how many there were
    pub fn cancel(&self) -> usize {
        let mut canceled = 0;
        for job in self.jobs.iter() {
            job.value().cancel();
            canceled += 1;
        }
        canceled
    }

    /// Cancels the running import of one site
    pub fn cancel_site(&self, site_key: &str) -> bool {
        match self.jobs.get(site_key) {
            Some(flag) => {
                flag.cancel();
                true
            }
            None => false,
        }
    }

    pub fn running(&self) -> usize {
        self.jobs.len()
    }
}

/// One job's hold on its site; dropping it ends the job's registration
struct RunningJob<'a> {
    site: SiteRegistration<'a>,
    jobs: &'a CancelHandle,
    cancel: CancellationFlag,
}

impl<'a> RunningJob<'a> {
    fn start(site: SiteRegistration<'a>, jobs: &'a CancelHandle) -> Self {
        let cancel = CancellationFlag::new();
        jobs.jobs.insert(site.site_key().to_string(), cancel.clone());
        Self { site, jobs, cancel }
    }
}

impl Drop for RunningJob<'_> {
    fn drop(&mut self) {
        self.jobs.jobs.remove(self.site.site_key());
    }
}

/// Runs site imports
pub struct SiteImporter {
    config: Config,
    services: ImportServices,
    repository: Option<Arc<SqliteRepository>>,
    queues: SiteQueueRegistry,
    jobs: CancelHandle,
}

impl SiteImporter {
    /// Creates an importer backed by the configured SQLite repository
    ///
    /// # Arguments
    ///
    /// * `config` - The importer configuration
    ///
    /// # Returns
    ///
    /// * `Ok(SiteImporter)` - Successfully created importer
    /// * `Err(ImportError)` - The repository or HTTP clients failed to initialize
    pub fn new(config: Config) -> Result<Self> {
        let repository = Arc::new(SqliteRepository::new(Path::new(
            &config.output.database_path,
        ))?);
        let timeout = config.importer.request_timeout();
        let connectivity = Arc::new(HttpConnectivity::new(timeout)?);
        let downloader = Arc::new(HttpDownloader::new(
            repository.clone(),
            config.user_agent.header_value(),
            timeout,
        )?);

        let services =
            ImportServices::from_repository(Arc::clone(&repository), connectivity, downloader);
        Ok(Self::with_services(config, services, Some(repository)))
    }

    /// Creates an importer over explicit collaborators
    pub fn with_services(
        config: Config,
        services: ImportServices,
        repository: Option<Arc<SqliteRepository>>,
    ) -> Self {
        Self {
            config,
            services,
            repository,
            queues: SiteQueueRegistry::new(),
            jobs: CancelHandle::default(),
        }
    }

    /// Handle that cancels the imports running on this importer
    pub fn cancel_handle(&self) -> CancelHandle {
        self.jobs.clone()
    }

    pub fn repository(&self) -> Option<&Arc<SqliteRepository>> {
        self.repository.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Imports one site
    ///
    /// A failed mandatory stage is reported in the summary, not as an error;
    /// errors are returned only when the job could not start (bad seed URL,
    /// unreachable seed, site already being imported).
    pub async fn import(&self, request: ImportRequest) -> Result<ImportSummary> {
        let site_key = request.site_name.trim().to_string();
        if site_key.is_empty() {
            return Err(ImportError::IllegalState("site name is empty".to_string()));
        }
        let seed = normalize_url(&request.seed_url)?;

        let site = self.queues.try_register(&site_key).ok_or_else(|| {
            ImportError::IllegalState(format!("an import of site {} is already running", site_key))
        })?;
        // Released on every exit, including when this future is dropped
        let job = RunningJob::start(site, &self.jobs);

        let result = self
            .run_job(&request, &site_key, seed, job.site.queue(), &job.cancel)
            .await;
        drop(job);
        result
    }

    async fn run_job(
        &self,
        request: &ImportRequest,
        site_key: &str,
        seed: Url,
        queue: &Arc<SiteQueue>,
        cancel: &CancellationFlag,
    ) -> Result<ImportSummary> {
        let started_at = Utc::now();
        let job_id = format!("{}-{}", site_key, started_at.timestamp_millis());
        let importer = &self.config.importer;

        tracing::info!("Starting import job {} for {} from {}", job_id, site_key, seed);

        let settings = LinkSettings {
            user_agent: self.config.user_agent.header_value(),
            follow_redirects: importer.follow_redirects,
            ignore_content_type: false,
            commit_timeout: importer.commit_drain_timeout(),
        };

        let response = self
            .services
            .connectivity
            .fetch(seed.as_str(), &settings.fetch_options())
            .await?;
        let document = response.document.ok_or_else(|| ImportError::Fetch {
            url: seed.to_string(),
            message: "seed is not an HTML document".to_string(),
        })?;
        let base = Url::parse(&response.final_url).unwrap_or_else(|_| seed.clone());

        let log = Arc::new(MemoryLog::new());
        let commits = Arc::new(CommitDispatcher::new(
            self.services.clone(),
            importer.max_commit_workers as usize,
            importer.synchronous_commits,
        ));

        let mut ctx = ImportContext::new(
            ImportPrincipal {
                user: request.user.clone(),
                job_id: job_id.clone(),
            },
            SiteHandle::new(site_key),
            seed.clone(),
            importer.max_depth,
            cancel.clone(),
            log.clone(),
            Arc::clone(queue),
            Arc::clone(&commits),
        );
        let mut content = PageContent::new(base, document);

        let runner = PipelineRunner::new(seed_pipeline(
            &self.services,
            settings,
            importer.commit_drain_timeout(),
        ));
        let report = runner.run(&mut content, &mut ctx).await;

        let commits_drained = commits.wait_drained(importer.commit_drain_timeout()).await;
        if !commits_drained {
            tracing::warn!(
                "Job {} finished with {} commits still running",
                job_id,
                commits.outstanding()
            );
        }

        let outcome = match report.outcome {
            PipelineOutcome::Completed => ImportOutcome::Completed,
            PipelineOutcome::Canceled => ImportOutcome::Canceled,
            PipelineOutcome::Failed { stage, cause } => ImportOutcome::Failed {
                stage: stage.to_string(),
                message: cause.to_string(),
            },
        };

        if !matches!(outcome, ImportOutcome::Failed { .. }) {
            if let Err(e) = self
                .services
                .summaries
                .update(site_key, &ctx.stats.to_increments())
            {
                tracing::error!("Failed to persist summary for {}: {}", site_key, e);
            }
        }

        tracing::info!("Import job {} {}", job_id, outcome);

        Ok(ImportSummary {
            job_id,
            site_name: site_key.to_string(),
            seed_url: seed.to_string(),
            user: request.user.clone(),
            outcome,
            stats: ctx.stats.snapshot(),
            pages_imported: queue.imported_ids().len(),
            pages_pending: queue.get_importing_ids().len(),
            commits_drained,
            timings: report.timings,
            started_at,
            finished_at: Utc::now(),
            log: log.messages(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ImporterConfig, OutputConfig, UserAgentConfig};
    use crate::connectivity::{Connectivity, FetchOptions, FetchResponse};
    use crate::repository::{PageStore, SiteStore};
    use crate::testing::{self, StaticConnectivity};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Cancels the importer's running jobs the first time a page is fetched
    struct CancelOnFirstFetch {
        pages: StaticConnectivity,
        handle: Mutex<Option<CancelHandle>>,
    }

    #[async_trait]
    impl Connectivity for CancelOnFirstFetch {
        async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse> {
            let handle = self.handle.lock().unwrap().take();
            if let Some(handle) = handle {
                handle.cancel();
            }
            self.pages.fetch(url, options).await
        }
    }

    fn config() -> Config {
        Config {
            importer: ImporterConfig {
                synchronous_commits: true,
                commit_drain_timeout_ms: 1000,
                ..ImporterConfig::default()
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestImporter".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            output: OutputConfig {
                database_path: ":memory:".to_string(),
                summary_path: "summary.md".to_string(),
            },
        }
    }

    fn importer(connectivity: StaticConnectivity) -> (SiteImporter, Arc<SqliteRepository>) {
        let repo = Arc::new(SqliteRepository::in_memory().unwrap());
        let services = testing::services_with(
            Arc::clone(&repo),
            Arc::new(connectivity),
            Arc::new(testing::RecordingDownloader::default()),
        );
        (
            SiteImporter::with_services(config(), services, Some(Arc::clone(&repo))),
            repo,
        )
    }

    fn request(site: &str) -> ImportRequest {
        ImportRequest {
            seed_url: "http://example.com/".to_string(),
            site_name: site.to_string(),
            user: "tester".to_string(),
        }
    }

    #[tokio::test]
    async fn test_import_builds_site_and_landing_page() {
        let connectivity = StaticConnectivity::default().with_page(
            "http://example.com/",
            "<html><head><title>Home</title></head><body><p>Welcome</p></body></html>",
        );
        let (importer, repo) = importer(connectivity);

        let summary = importer.import(request("docs")).await.unwrap();

        assert!(summary.outcome.is_completed());
        assert!(summary.commits_drained);
        assert_eq!(summary.pages_imported, 1);
        assert_eq!(summary.pages_pending, 0);

        let landing = repo.find_page_by_path("/docs/index.html").await.unwrap().unwrap();
        assert_eq!(landing.title.as_deref(), Some("Home"));
        assert!(!importer.queues.contains("docs"));
    }

    #[tokio::test]
    async fn test_second_import_of_same_site_fails_and_keeps_first() {
        let connectivity = StaticConnectivity::default()
            .with_page("http://example.com/", "<html><body>home</body></html>");
        let (importer, repo) = importer(connectivity);

        importer.import(request("docs")).await.unwrap();
        let summary = importer.import(request("docs")).await.unwrap();

        assert!(matches!(summary.outcome, ImportOutcome::Failed { .. }));
        assert_eq!(repo.list_sites().unwrap().len(), 1);
        assert!(repo.find_site("docs").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unreachable_seed_is_an_error() {
        let (importer, _) = importer(StaticConnectivity::default());
        let result = importer.import(request("docs")).await;
        assert!(matches!(result, Err(ImportError::FetchStatus { status: 404, .. })));
        assert!(!importer.queues.contains("docs"));
    }

    #[tokio::test]
    async fn test_cancel_reaches_only_the_running_job() {
        let connectivity = Arc::new(CancelOnFirstFetch {
            pages: StaticConnectivity::default()
                .with_page("http://example.com/", "<html><body>home</body></html>"),
            handle: Mutex::new(None),
        });
        let repo = Arc::new(SqliteRepository::in_memory().unwrap());
        let services = testing::services_with(
            Arc::clone(&repo),
            connectivity.clone(),
            Arc::new(testing::RecordingDownloader::default()),
        );
        let importer = SiteImporter::with_services(config(), services, Some(Arc::clone(&repo)));
        *connectivity.handle.lock().unwrap() = Some(importer.cancel_handle());

        let canceled = importer.import(request("docs")).await.unwrap();
        assert_eq!(canceled.outcome, ImportOutcome::Canceled);
        assert!(repo.find_site("docs").await.unwrap().is_none());
        assert_eq!(importer.cancel_handle().running(), 0);

        let summary = importer.import(request("docs")).await.unwrap();
        assert!(summary.outcome.is_completed());
        assert!(repo.find_site("docs").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cancel_while_idle_is_a_no_op() {
        let connectivity = StaticConnectivity::default()
            .with_page("http://example.com/", "<html><body>home</body></html>");
        let (importer, _) = importer(connectivity);

        assert_eq!(importer.cancel_handle().cancel(), 0);
        assert!(!importer.cancel_handle().cancel_site("docs"));

        let summary = importer.import(request("docs")).await.unwrap();
        assert!(summary.outcome.is_completed());
    }

    #[tokio::test]
    async fn test_concurrent_imports_of_one_site_admit_one() {
        let connectivity = StaticConnectivity::default()
            .with_page("http://example.com/", "<html><body>home</body></html>")
            .with_latency(Duration::from_millis(100));
        let (importer, repo) = importer(connectivity);

        let (first, second) = tokio::join!(
            importer.import(request("docs")),
            importer.import(request("docs"))
        );
        let results = [first, second];

        let completed = results
            .iter()
            .filter(|r| matches!(r, Ok(summary) if summary.outcome.is_completed()))
            .count();
        let refused = results
            .iter()
            .filter(|r| matches!(r, Err(ImportError::IllegalState(_))))
            .count();
        assert_eq!((completed, refused), (1, 1));
        assert_eq!(repo.list_sites().unwrap().len(), 1);
        assert!(!importer.queues.contains("docs"));
    }

    #[tokio::test]
    async fn test_dropped_import_releases_site() {
        let connectivity = StaticConnectivity::default()
            .with_page("http://example.com/", "<html><body>home</body></html>")
            .with_latency(Duration::from_secs(5));
        let (importer, _) = importer(connectivity);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), importer.import(request("docs"))).await;

        assert!(abandoned.is_err());
        assert!(!importer.queues.contains("docs"));
        assert_eq!(importer.cancel_handle().running(), 0);
    }
}
