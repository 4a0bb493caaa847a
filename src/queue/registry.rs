use crate::queue::SiteQueue;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Lookup of live site queues, one per site being imported
///
/// A site is registered for the length of one import job, including all of
/// its commit workers; at most one registration per site key exists at a time.
#[derive(Debug, Default)]
pub struct SiteQueueRegistry {
    queues: DashMap<String, Arc<SiteQueue>>,
}

impl SiteQueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh queue for `site_key`
    ///
    /// Returns `None` when the site is already registered. The check and the
    /// insert are one entry operation, so concurrent callers for the same
    /// key cannot both succeed.
    pub fn try_register(&self, site_key: &str) -> Option<SiteRegistration<'_>> {
        match self.queues.entry(site_key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                let queue = Arc::new(SiteQueue::new(site_key));
                entry.insert(Arc::clone(&queue));
                Some(SiteRegistration {
                    registry: self,
                    site_key: site_key.to_string(),
                    queue,
                })
            }
        }
    }

    pub fn get(&self, site_key: &str) -> Option<Arc<SiteQueue>> {
        self.queues.get(site_key).map(|queue| Arc::clone(queue.value()))
    }

    pub fn contains(&self, site_key: &str) -> bool {
        self.queues.contains_key(site_key)
    }

    fn release(&self, site_key: &str) {
        self.queues.remove(site_key);
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

/// A site's registration; the site is released when this is dropped
#[derive(Debug)]
pub struct SiteRegistration<'a> {
    registry: &'a SiteQueueRegistry,
    site_key: String,
    queue: Arc<SiteQueue>,
}

impl SiteRegistration<'_> {
    pub fn site_key(&self) -> &str {
        &self.site_key
    }

    pub fn queue(&self) -> &Arc<SiteQueue> {
        &self.queue
    }
}

impl Drop for SiteRegistration<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.site_key);
    }
}
