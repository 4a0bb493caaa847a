use crate::commit::{AsyncCommitWorker, CommitRequest, CommitTracker};
use crate::pipeline::ImportServices;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Hands commit requests to a bounded pool of background workers
///
/// Each request is counted by the tracker from the moment it is dispatched
/// until its worker finishes, whether it succeeded or not. With
/// `synchronous` set, requests run inline and `dispatch` returns only after
/// the commit completed.
pub struct CommitDispatcher {
    worker: Arc<AsyncCommitWorker>,
    tracker: Arc<CommitTracker>,
    permits: Arc<Semaphore>,
    synchronous: bool,
}

impl CommitDispatcher {
    pub fn new(services: ImportServices, max_workers: usize, synchronous: bool) -> Self {
        Self {
            worker: Arc::new(AsyncCommitWorker::new(services)),
            tracker: Arc::new(CommitTracker::new()),
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
            synchronous,
        }
    }

    pub async fn dispatch(&self, request: CommitRequest) {
        let guard = self.tracker.begin();

        if self.synchronous {
            self.worker.run(request).await;
            drop(guard);
            return;
        }

        let worker = Arc::clone(&self.worker);
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _guard = guard;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    request.queue.remove_importing_id(request.page_id);
                    tracing::error!("Commit pool closed before page {} was written", request.page_id);
                    return;
                }
            };
            worker.run(request).await;
        });
    }

    pub fn outstanding(&self) -> usize {
        self.tracker.outstanding()
    }

    /// Waits for every dispatched commit to finish; false on timeout
    pub async fn wait_drained(&self, timeout: Duration) -> bool {
        self.tracker.wait_drained(timeout).await
    }

    pub fn tracker(&self) -> &Arc<CommitTracker> {
        &self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::PageBody;
    use crate::pipeline::ImportPrincipal;
    use crate::queue::SiteQueue;
    use crate::repository::{PageCatalogService, SiteStore, SqliteRepository};
    use crate::testing;

    #[tokio::test]
    async fn test_async_dispatch_drains() {
        let repo = Arc::new(SqliteRepository::in_memory().unwrap());
        repo.create_site("site", "http://example.com/", None).await.unwrap();
        let queue = Arc::new(SiteQueue::new("site"));
        let dispatcher = CommitDispatcher::new(testing::services(Arc::clone(&repo)), 2, false);

        let mut ids = Vec::new();
        for n in 0..5 {
            let handle = repo
                .add_catalog_page("site", &format!("p{}.html", n), "", "/site", "")
                .await
                .unwrap()
                .unwrap();
            queue.add_importing_id(handle.id);
            ids.push(handle.id);
            dispatcher
                .dispatch(CommitRequest {
                    page_id: handle.id,
                    body: PageBody::default(),
                    template_id: None,
                    principal: ImportPrincipal {
                        user: "tester".to_string(),
                        job_id: "job".to_string(),
                    },
                    queue: Arc::clone(&queue),
                })
                .await;
        }

        assert!(dispatcher.wait_drained(Duration::from_secs(10)).await);
        assert_eq!(dispatcher.outstanding(), 0);
        for id in ids {
            assert!(queue.is_imported(id));
        }
    }

    #[tokio::test]
    async fn test_synchronous_dispatch_counts_failures() {
        let repo = Arc::new(SqliteRepository::in_memory().unwrap());
        let queue = Arc::new(SiteQueue::new("site"));
        let dispatcher = CommitDispatcher::new(testing::services(repo), 1, true);
        queue.add_importing_id(77);

        dispatcher
            .dispatch(CommitRequest {
                page_id: 77,
                body: PageBody::default(),
                template_id: None,
                principal: ImportPrincipal {
                    user: "tester".to_string(),
                    job_id: "job".to_string(),
                },
                queue: Arc::clone(&queue),
            })
            .await;

        assert_eq!(dispatcher.outstanding(), 0);
        assert!(!queue.is_importing(77));
        assert!(!queue.is_imported(77));
    }
}
