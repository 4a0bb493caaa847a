use crate::repository::{RepositoryResult, SqliteRepository};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};

/// Receives per-category increments for a site
pub trait SummaryAccumulator: Send + Sync {
    fn update(&self, site_key: &str, increments: &HashMap<String, u64>) -> RepositoryResult<()>;
}

/// Running per-category counters for one import job
///
/// Each category is updated atomically; concurrent updates to different
/// categories do not contend.
#[derive(Debug, Default)]
pub struct SummaryStats {
    counts: DashMap<String, u64>,
}

impl SummaryStats {
    pub const PAGES: &'static str = "pages";
    pub const INTERNAL_LINKS: &'static str = "internallinks";
    pub const FILES: &'static str = "files";
    pub const STYLESHEETS: &'static str = "stylesheets";
    pub const ERRORS: &'static str = "errors";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, category: &str, amount: u64) {
        if amount == 0 {
            return;
        }
        *self.counts.entry(category.to_string()).or_insert(0) += amount;
    }

    pub fn get(&self, category: &str) -> u64 {
        self.counts.get(category).map(|count| *count).unwrap_or(0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counts
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn to_increments(&self) -> HashMap<String, u64> {
        self.snapshot().into_iter().collect()
    }
}

impl SummaryAccumulator for SummaryStats {
    /// Zero increments are dropped so they never touch a category
    fn update(&self, _site_key: &str, increments: &HashMap<String, u64>) -> RepositoryResult<()> {
        for (category, amount) in increments {
            self.increment(category, *amount);
        }
        Ok(())
    }
}

impl SummaryAccumulator for SqliteRepository {
    fn update(&self, site_key: &str, increments: &HashMap<String, u64>) -> RepositoryResult<()> {
        let non_zero: HashMap<String, u64> = increments
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(category, amount)| (category.clone(), *amount))
            .collect();
        self.save_summary(site_key, &non_zero)
    }
}
