//! Queue module for per-site link and commit tracking
//!
//! # Components
//!
//! - `SiteQueue`: which URLs already have a decision, which content ids are
//!   being committed, and which finished committing
//! - `SiteQueueRegistry`: job-scoped lookup of queues by site key

mod registry;
mod site_queue;

pub use registry::{SiteQueueRegistry, SiteRegistration};
pub use site_queue::{LinkClaim, SiteQueue};
