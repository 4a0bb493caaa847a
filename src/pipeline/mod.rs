//! Import pipeline: stages, their runner, and the state threaded through them
//!
//! A pipeline is an ordered list of [`ImportStage`]s run against one page.
//! Mandatory stage failures roll back everything that already succeeded;
//! optional stage failures are logged and skipped.

mod context;
mod runner;
mod services;
mod stage;
mod stats;

pub use context::{CancellationFlag, ImportContext, ImportPrincipal, SiteHandle};
pub use runner::{PipelineOutcome, PipelineReport, PipelineRunner, StageStatus, StageTiming};
pub use services::ImportServices;
pub use stage::ImportStage;
pub use stats::{SummaryAccumulator, SummaryStats};
