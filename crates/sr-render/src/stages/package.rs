//! Package: read the finished file back out of the engine.

use async_trait::async_trait;

use sr_core::{Error, Result};
use sr_engine::TranscodeEngine;

use crate::context::{discard, RenderContext};
use crate::stage::Stage;

const NAME: &str = "package";

pub struct PackageStage;

#[async_trait]
impl Stage for PackageStage {
    fn name(&self) -> &'static str {
        NAME
    }

    fn progress_range(&self) -> (f32, f32) {
        (0.90, 1.0)
    }

    async fn run(&self, ctx: &mut RenderContext, engine: &mut dyn TranscodeEngine) -> Result<()> {
        let name = ctx
            .output
            .clone()
            .or_else(|| ctx.video.clone())
            .ok_or_else(|| Error::render(NAME, "no finished file to package"))?;

        ctx.progress
            .report_within(self.progress_range(), 0.5, "Packaging");
        let data = engine
            .read_file(&name)
            .await
            .map_err(|e| Error::render(NAME, format!("could not read {name}: {e}")))?;
        discard(engine, &[name]).await;

        if data.is_empty() {
            return Err(Error::render(NAME, "engine produced an empty file"));
        }
        ctx.log
            .info(NAME, format!("export ready ({} bytes)", data.len()));
        ctx.data = Some(data);
        Ok(())
    }
}
