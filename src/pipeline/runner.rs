use crate::content::PageContent;
use crate::pipeline::{ImportContext, ImportStage, SummaryStats};
use crate::ImportError;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How a single stage invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Succeeded,
    /// Optional stage failed; the run continued
    Skipped,
    Failed,
}

/// Wall-clock time spent in one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: &'static str,
    pub elapsed: Duration,
    pub status: StageStatus,
}

/// Terminal state of a pipeline run
#[derive(Debug)]
pub enum PipelineOutcome {
    Completed,
    /// A mandatory stage failed and every earlier stage was rolled back
    Failed {
        stage: &'static str,
        cause: ImportError,
    },
    /// Cancellation was observed; nothing was rolled back
    Canceled,
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Outcome plus per-stage timings of one run
#[derive(Debug)]
pub struct PipelineReport {
    pub outcome: PipelineOutcome,
    pub timings: Vec<StageTiming>,
}

impl PipelineReport {
    pub fn total_elapsed(&self) -> Duration {
        self.timings.iter().map(|t| t.elapsed).sum()
    }
}

/// Runs an ordered list of stages against one page
///
/// # Failure handling
///
/// | Condition | Action |
/// |-----------|--------|
/// | Cancellation before a stage | Stop, report `Canceled`, no rollback |
/// | Mandatory stage fails | Roll back succeeded stages in reverse order, report `Failed` |
/// | Optional stage fails | Log, count an error, continue with the next stage |
#[derive(Clone)]
pub struct PipelineRunner {
    stages: Vec<Arc<dyn ImportStage>>,
}

impl PipelineRunner {
    pub fn new(stages: Vec<Arc<dyn ImportStage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage in order
    ///
    /// # Arguments
    ///
    /// * `content` - The page being imported; stages fill in its derived fields
    /// * `ctx` - Job and page state shared by the stages
    ///
    /// # Returns
    ///
    /// A report carrying the outcome and one timing entry per stage invoked
    pub async fn run(&self, content: &mut PageContent, ctx: &mut ImportContext) -> PipelineReport {
        let mut timings = Vec::with_capacity(self.stages.len());
        let mut succeeded: Vec<&Arc<dyn ImportStage>> = Vec::new();

        for stage in &self.stages {
            if ctx.is_canceled() {
                tracing::info!("Pipeline canceled before stage {}", stage.name());
                return PipelineReport {
                    outcome: PipelineOutcome::Canceled,
                    timings,
                };
            }

            let started = Instant::now();
            let result = stage.process(content, ctx).await;
            let elapsed = started.elapsed();

            match result {
                Ok(()) => {
                    tracing::debug!("Stage {} finished in {:?}", stage.name(), elapsed);
                    timings.push(StageTiming {
                        stage: stage.name(),
                        elapsed,
                        status: StageStatus::Succeeded,
                    });
                    succeeded.push(stage);
                }
                Err(ImportError::Canceled) => {
                    tracing::info!("Stage {} observed cancellation", stage.name());
                    timings.push(StageTiming {
                        stage: stage.name(),
                        elapsed,
                        status: StageStatus::Failed,
                    });
                    return PipelineReport {
                        outcome: PipelineOutcome::Canceled,
                        timings,
                    };
                }
                Err(e) if stage.is_mandatory() => {
                    tracing::error!("Mandatory stage {} failed: {}", stage.name(), e);
                    ctx.log.error(stage.name(), &e.to_string());
                    timings.push(StageTiming {
                        stage: stage.name(),
                        elapsed,
                        status: StageStatus::Failed,
                    });

                    for done in succeeded.iter().rev() {
                        if let Err(rollback_error) = done.rollback(content, ctx).await {
                            tracing::error!(
                                "Rollback of stage {} failed: {}",
                                done.name(),
                                rollback_error
                            );
                            ctx.log.error(done.name(), &rollback_error.to_string());
                        }
                    }

                    return PipelineReport {
                        outcome: PipelineOutcome::Failed {
                            stage: stage.name(),
                            cause: e,
                        },
                        timings,
                    };
                }
                Err(e) => {
                    tracing::warn!("Optional stage {} failed: {}", stage.name(), e);
                    ctx.log.error(stage.name(), &e.to_string());
                    ctx.stats.increment(SummaryStats::ERRORS, 1);
                    timings.push(StageTiming {
                        stage: stage.name(),
                        elapsed,
                        status: StageStatus::Skipped,
                    });
                }
            }
        }

        PipelineReport {
            outcome: PipelineOutcome::Completed,
            timings,
        }
    }
}
