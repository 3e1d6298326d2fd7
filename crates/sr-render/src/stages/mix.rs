//! Mix: delay every audio segment to its start, sum them and mux the result
//! under the joined video. Inputs that do not decode are left out; if no
//! mix can be made the export falls back to the video alone.

use async_trait::async_trait;

use sr_core::{frames_to_millis, Result};
use sr_engine::args::{decode_check_args, mix_args, source_extension};
use sr_engine::TranscodeEngine;

use crate::context::{discard, RenderContext};
use crate::stage::Stage;

const NAME: &str = "mix";

pub struct MixStage;

#[async_trait]
impl Stage for MixStage {
    fn name(&self) -> &'static str {
        NAME
    }

    fn progress_range(&self) -> (f32, f32) {
        (0.65, 0.90)
    }

    fn applies(&self, ctx: &RenderContext) -> bool {
        !ctx.audio.is_empty()
    }

    async fn run(&self, ctx: &mut RenderContext, engine: &mut dyn TranscodeEngine) -> Result<()> {
        let range = self.progress_range();
        let Some(video) = ctx.video.clone() else {
            ctx.log.warn(NAME, "no video to mix against");
            return Ok(());
        };
        ctx.output = Some(video.clone());

        let segments = ctx.audio.clone();
        let total = segments.len();
        // Fetching takes the first half of the range, the mix the rest.
        let mut loaded: Vec<(String, i64)> = Vec::with_capacity(total);
        for (i, seg) in segments.iter().enumerate() {
            let label = format!("Loading audio {}/{total}", i + 1);
            ctx.progress
                .report_within(range, 0.5 * i as f32 / total as f32, &label);

            let name = ctx.file_name("aud", Some(i), &source_extension(&seg.location, seg.kind));
            let stored = match ctx.fetcher.fetch(&seg.location).await {
                Ok(bytes) => engine.write_file(&name, bytes).await,
                Err(e) => Err(e),
            };
            match stored {
                Ok(()) => loaded.push((name, frames_to_millis(seg.start_frame))),
                Err(e) => {
                    discard(engine, &[name]).await;
                    let msg = format!("audio {}/{total} {} skipped: {e}", i + 1, ctx.describe(seg));
                    ctx.log.warn(NAME, msg);
                }
            }
        }

        if loaded.is_empty() {
            ctx.log
                .warn(NAME, "no audio could be loaded; exporting video without sound");
            return Ok(());
        }

        ctx.progress.report_within(range, 0.5, "Mixing audio");
        let inputs: Vec<String> = loaded.iter().map(|(name, _)| name.clone()).collect();
        let mixed = ctx.file_name("mixed", None, "mp4");
        let mut outcome = mix_once(engine, &video, &loaded, &mixed, ctx).await;

        // A single unusable input (a clip with no audio stream, say) fails
        // the whole amix. Keep the inputs that decode and mix those alone.
        if let Err(reason) = outcome.clone() {
            if loaded.len() > 1 {
                ctx.log
                    .warn(NAME, format!("audio mix failed ({reason}); checking each input"));
                ctx.progress
                    .report_within(range, 0.75, "Checking audio inputs");
                let mut usable = Vec::with_capacity(loaded.len());
                for (name, delay) in &loaded {
                    match decodes_audio(engine, name).await {
                        Ok(()) => usable.push((name.clone(), *delay)),
                        Err(why) => ctx
                            .log
                            .warn(NAME, format!("audio input {name} left out of the mix: {why}")),
                    }
                }
                if usable.is_empty() {
                    outcome = Err("no audio input could be decoded".to_string());
                } else if usable.len() < loaded.len() {
                    ctx.progress.report_within(range, 0.85, "Mixing audio");
                    outcome = mix_once(engine, &video, &usable, &mixed, ctx).await;
                }
            }
        }
        discard(engine, &inputs).await;

        match outcome {
            Ok(count) => {
                discard(engine, &[video]).await;
                ctx.log.info(NAME, format!("mixed {count} audio segments"));
                ctx.output = Some(mixed);
                ctx.audio_mixed = true;
            }
            Err(reason) => {
                discard(engine, &[mixed]).await;
                ctx.log.warn(
                    NAME,
                    format!("audio mix failed: {reason}; exporting video without sound"),
                );
            }
        }
        Ok(())
    }
}

/// Run one mix of `inputs` under `video` into `output`. Returns the number
/// of inputs mixed, or why the engine refused.
async fn mix_once(
    engine: &mut dyn TranscodeEngine,
    video: &str,
    inputs: &[(String, i64)],
    output: &str,
    ctx: &RenderContext,
) -> std::result::Result<usize, String> {
    match engine.exec(&mix_args(video, inputs, output, &ctx.config)).await {
        Ok(out) if out.success() => Ok(inputs.len()),
        Ok(out) => Err(format!("exit code {}: {}", out.exit_code, out.last_log_line())),
        Err(e) => Err(e.to_string()),
    }
}

async fn decodes_audio(
    engine: &mut dyn TranscodeEngine,
    name: &str,
) -> std::result::Result<(), String> {
    match engine.exec(&decode_check_args(name)).await {
        Ok(out) if out.success() => Ok(()),
        Ok(out) => Err(out.last_log_line().to_string()),
        Err(e) => Err(e.to_string()),
    }
}
