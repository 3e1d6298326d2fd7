//! The [`Stage`] trait: one step of the export.

use async_trait::async_trait;

use sr_engine::TranscodeEngine;

use crate::context::RenderContext;

/// A step of the render pipeline.
///
/// Stages run strictly one after another against the same engine session.
/// A stage absorbs recoverable failures into the context's log and returns
/// an error only when the export cannot continue. Each stage deletes the
/// engine files it no longer needs before returning.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Share of overall progress covered by this stage.
    fn progress_range(&self) -> (f32, f32);

    /// Whether the stage has anything to do for this export.
    fn applies(&self, _ctx: &RenderContext) -> bool {
        true
    }

    async fn run(
        &self,
        ctx: &mut RenderContext,
        engine: &mut dyn TranscodeEngine,
    ) -> sr_core::Result<()>;
}
