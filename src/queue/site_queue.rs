use crate::content::Link;
use crate::repository::ContentId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

/// Outcome of trying to claim a URL for fetching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkClaim {
    /// This caller registered the URL and must decide it
    Claimed,
    /// Another caller got there first; this is its decision so far
    AlreadyProcessed(Link),
}

#[derive(Debug, Default)]
struct ImportState {
    importing: HashSet<ContentId>,
    imported: HashSet<ContentId>,
}

/// Per-site registry of link decisions and in-flight commits
///
/// Shared between the crawl task and every commit worker of the same site.
/// Processed links live in a sharded concurrent map so the check-then-set on
/// a URL is one atomic entry operation. The importing and imported sets sit
/// behind a single lock so moving an id between them is never observable
/// half-done. Every id leaving the importing set wakes `wait_until_settled`.
#[derive(Debug)]
pub struct SiteQueue {
    site_key: String,
    processed_links: DashMap<String, Link>,
    imports: Mutex<ImportState>,
    settled: Notify,
}

impl SiteQueue {
    pub fn new(site_key: impl Into<String>) -> Self {
        Self {
            site_key: site_key.into(),
            processed_links: DashMap::new(),
            imports: Mutex::new(ImportState::default()),
            settled: Notify::new(),
        }
    }

    pub fn site_key(&self) -> &str {
        &self.site_key
    }

    // ===== Processed links =====

    pub fn has_link_been_processed(&self, url: &str) -> bool {
        self.processed_links.contains_key(url)
    }

    /// Records a decision for `url` if none exists yet
    ///
    /// Returns true when this call inserted the entry. Exactly one of any
    /// number of concurrent callers for the same URL sees true.
    pub fn set_processed_link(&self, url: &str, link: Link) -> bool {
        matches!(self.claim_link(url, link), LinkClaim::Claimed)
    }

    /// Atomic insert-if-absent that also hands back the existing decision
    pub fn claim_link(&self, url: &str, placeholder: Link) -> LinkClaim {
        match self.processed_links.entry(url.to_string()) {
            Entry::Occupied(existing) => LinkClaim::AlreadyProcessed(existing.get().clone()),
            Entry::Vacant(slot) => {
                slot.insert(placeholder);
                LinkClaim::Claimed
            }
        }
    }

    /// Replaces the placeholder decision for a URL this caller claimed
    ///
    /// Resolved decisions are write-once; an update against one is ignored
    /// and false is returned.
    pub fn update_processed_link(&self, url: &str, link: Link) -> bool {
        match self.processed_links.get_mut(url) {
            Some(mut existing) if !existing.resolved => {
                *existing = link;
                true
            }
            _ => false,
        }
    }

    pub fn processed_link(&self, url: &str) -> Option<Link> {
        self.processed_links.get(url).map(|entry| entry.value().clone())
    }

    pub fn processed_count(&self) -> usize {
        self.processed_links.len()
    }

    // ===== Import tracking =====

    fn imports(&self) -> MutexGuard<'_, ImportState> {
        // The guarded sets stay consistent even if a holder panicked, since
        // every mutation is a single insert or remove.
        self.imports.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Marks content as being committed; false if it already was
    pub fn add_importing_id(&self, id: ContentId) -> bool {
        let mut state = self.imports();
        if state.imported.contains(&id) {
            return false;
        }
        state.importing.insert(id)
    }

    pub fn remove_importing_id(&self, id: ContentId) -> bool {
        let removed = self.imports().importing.remove(&id);
        if removed {
            self.settled.notify_waiters();
        }
        removed
    }

    /// Moves content from importing to imported
    ///
    /// Does nothing and returns false if the id is no longer importing,
    /// which happens when its commit was withdrawn while the worker ran.
    pub fn add_imported_id(&self, id: ContentId) -> bool {
        let moved = {
            let mut state = self.imports();
            if state.importing.remove(&id) {
                state.imported.insert(id);
                true
            } else {
                false
            }
        };
        if moved {
            self.settled.notify_waiters();
        }
        moved
    }

    pub fn get_importing_ids(&self) -> HashSet<ContentId> {
        self.imports().importing.clone()
    }

    pub fn imported_ids(&self) -> HashSet<ContentId> {
        self.imports().imported.clone()
    }

    pub fn is_importing(&self, id: ContentId) -> bool {
        self.imports().importing.contains(&id)
    }

    pub fn is_imported(&self, id: ContentId) -> bool {
        self.imports().imported.contains(&id)
    }

    /// Waits until `id` is no longer importing, whatever its commit's result
    ///
    /// Returns false when `timeout` elapsed first.
    pub async fn wait_until_settled(&self, id: ContentId, timeout: Duration) -> bool {
        let settled = async {
            loop {
                // Registered before the check so a wake-up in between is kept
                let notified = self.settled.notified();
                if !self.is_importing(id) {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, settled).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ElementLocator, LinkKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn link(url: &str, resolved: bool) -> Link {
        Link {
            absolute_link: url.to_string(),
            relative_path_with_file_name: "/site/page".to_string(),
            link_path: "/site".to_string(),
            link_text: String::new(),
            page_name: "page".to_string(),
            element: ElementLocator {
                tag: "a".to_string(),
                attribute: "href".to_string(),
                ordinal: 0,
                original: url.to_string(),
            },
            kind: LinkKind::Page,
            resolved,
        }
    }

    #[test]
    fn test_claim_is_insert_if_absent() {
        let queue = SiteQueue::new("site");
        let url = "http://example.com/page";

        assert!(!queue.has_link_been_processed(url));
        assert_eq!(queue.claim_link(url, link(url, false)), LinkClaim::Claimed);
        assert!(queue.has_link_been_processed(url));
        assert!(matches!(
            queue.claim_link(url, link(url, false)),
            LinkClaim::AlreadyProcessed(_)
        ));
        assert!(!queue.set_processed_link(url, link(url, true)));
    }

    #[test]
    fn test_resolved_decision_is_write_once() {
        let queue = SiteQueue::new("site");
        let url = "http://example.com/page";
        queue.claim_link(url, link(url, false));

        let mut decided = link(url, true);
        decided.relative_path_with_file_name = "/site/page/index.html".to_string();
        assert!(queue.update_processed_link(url, decided));
        assert!(!queue.update_processed_link(url, link(url, true)));

        let stored = queue.processed_link(url).unwrap();
        assert_eq!(stored.relative_path_with_file_name, "/site/page/index.html");
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let queue = Arc::new(SiteQueue::new("site"));
        let winners = Arc::new(AtomicUsize::new(0));
        let url = "http://example.com/shared-nav";

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if queue.set_processed_link(url, link(url, false)) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(queue.processed_count(), 1);
    }

    #[test]
    fn test_import_success_moves_id() {
        let queue = SiteQueue::new("site");
        assert!(queue.add_importing_id(7));
        assert!(queue.get_importing_ids().contains(&7));

        assert!(queue.add_imported_id(7));
        assert!(!queue.is_importing(7));
        assert!(queue.is_imported(7));
    }

    #[test]
    fn test_imported_requires_importing() {
        let queue = SiteQueue::new("site");
        assert!(queue.add_importing_id(3));
        assert!(queue.remove_importing_id(3));

        assert!(!queue.add_imported_id(3));
        assert!(!queue.is_imported(3));
        assert!(queue.get_importing_ids().is_empty());
    }

    #[test]
    fn test_imported_id_cannot_restart() {
        let queue = SiteQueue::new("site");
        queue.add_importing_id(5);
        queue.add_imported_id(5);
        assert!(!queue.add_importing_id(5));
        assert!(!queue.is_importing(5));
    }

    #[tokio::test]
    async fn test_wait_until_settled_wakes_on_commit() {
        let queue = Arc::new(SiteQueue::new("site"));
        queue.add_importing_id(9);

        let worker = Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            worker.add_imported_id(9);
        });

        assert!(queue.wait_until_settled(9, Duration::from_secs(5)).await);
        assert!(queue.is_imported(9));
    }

    #[tokio::test]
    async fn test_wait_until_settled_times_out() {
        let queue = SiteQueue::new("site");
        queue.add_importing_id(4);

        assert!(!queue.wait_until_settled(4, Duration::from_millis(20)).await);
        assert!(queue.wait_until_settled(5, Duration::from_millis(20)).await);
    }
}
