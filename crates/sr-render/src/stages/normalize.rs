//! Normalize: every main-track segment becomes a uniform video-only clip.

use async_trait::async_trait;

use sr_core::{Error, MediaKind, Result};
use sr_engine::args::{normalize_args, source_extension};
use sr_engine::TranscodeEngine;
use sr_timeline::TimelineSegment;

use crate::context::{discard, RenderContext};
use crate::stage::Stage;

const NAME: &str = "normalize";

pub struct NormalizeStage;

#[async_trait]
impl Stage for NormalizeStage {
    fn name(&self) -> &'static str {
        NAME
    }

    fn progress_range(&self) -> (f32, f32) {
        (0.05, 0.60)
    }

    async fn run(&self, ctx: &mut RenderContext, engine: &mut dyn TranscodeEngine) -> Result<()> {
        let range = self.progress_range();
        let segments = ctx.main.clone();
        let total = segments.len();

        for (i, seg) in segments.iter().enumerate() {
            let label = format!("Preparing clip {}/{total}", i + 1);
            ctx.progress.report_within(range, i as f32 / total as f32, &label);

            match normalize_one(ctx, engine, i, seg).await {
                Ok(clip) => ctx.clips.push(clip),
                Err(e) => {
                    let msg = format!("clip {}/{total} {} skipped: {e}", i + 1, ctx.describe(seg));
                    ctx.log.warn(NAME, msg.clone());
                    ctx.clip_failures.push(msg);
                }
            }

            ctx.progress
                .report_within(range, (i + 1) as f32 / total as f32, &label);
        }

        ctx.log.info(
            NAME,
            format!("{} of {total} clips prepared", ctx.clips.len()),
        );
        Ok(())
    }
}

/// Fetch, encode and release one segment's source. Returns the clip name.
async fn normalize_one(
    ctx: &RenderContext,
    engine: &mut dyn TranscodeEngine,
    index: usize,
    seg: &TimelineSegment,
) -> Result<String> {
    if seg.kind == MediaKind::Audio {
        return Err(Error::Validation(
            "audio cannot be placed on the main video track".into(),
        ));
    }

    let bytes = ctx.fetcher.fetch(&seg.location).await?;
    let input = ctx.file_name("src", Some(index), &source_extension(&seg.location, seg.kind));
    let output = ctx.file_name("clip", Some(index), "mp4");

    // The source is released as soon as its clip exists.
    let written = engine.write_file(&input, bytes).await;
    let result = match written {
        Ok(()) => {
            let args = normalize_args(&input, &output, seg.kind, seg.duration, &ctx.config);
            engine.exec(&args).await
        }
        Err(e) => Err(e),
    };
    discard(engine, &[input]).await;

    let out = result?;
    if !out.success() {
        discard(engine, &[output]).await;
        return Err(Error::tool(
            "ffmpeg",
            format!("exit code {}: {}", out.exit_code, out.last_log_line()),
        ));
    }
    tracing::debug!("normalized segment {} into {output}", seg.id);
    Ok(output)
}
