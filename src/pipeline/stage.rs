use crate::content::PageContent;
use crate::pipeline::ImportContext;
use crate::Result;
use async_trait::async_trait;

/// One named, orderable unit of the import pipeline
///
/// Stages keep no state between invocations apart from internal lookup
/// caches. `rollback` receives the same content and context the stage last
/// processed and must tolerate finding nothing to undo.
#[async_trait]
pub trait ImportStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Mandatory failures abort the run and roll back; optional ones are skipped
    fn is_mandatory(&self) -> bool;

    async fn process(&self, content: &mut PageContent, ctx: &mut ImportContext) -> Result<()>;

    async fn rollback(&self, _content: &mut PageContent, _ctx: &mut ImportContext) -> Result<()> {
        Ok(())
    }
}
