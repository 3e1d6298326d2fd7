//! Concat: join the normalized clips without re-encoding.

use async_trait::async_trait;
use bytes::Bytes;

use sr_core::{Error, Result};
use sr_engine::args::{concat_args, concat_list};
use sr_engine::TranscodeEngine;

use crate::context::{discard, RenderContext};
use crate::stage::Stage;

const NAME: &str = "concat";

pub struct ConcatStage;

#[async_trait]
impl Stage for ConcatStage {
    fn name(&self) -> &'static str {
        NAME
    }

    fn progress_range(&self) -> (f32, f32) {
        (0.60, 0.65)
    }

    async fn run(&self, ctx: &mut RenderContext, engine: &mut dyn TranscodeEngine) -> Result<()> {
        match ctx.clips.len() {
            0 => {
                let cause = if ctx.clip_failures.is_empty() {
                    "no clips were produced".to_string()
                } else {
                    ctx.clip_failures.join("; ")
                };
                Err(Error::render(
                    NAME,
                    format!("all {} clips failed to encode: {cause}", ctx.main.len()),
                ))
            }
            1 => {
                ctx.log.info(NAME, "single clip; nothing to join");
                ctx.video = Some(ctx.clips[0].clone());
                Ok(())
            }
            n => {
                ctx.progress
                    .report_within(self.progress_range(), 0.0, &format!("Joining {n} clips"));
                let list = ctx.file_name("list", None, "txt");
                let joined = ctx.file_name("joined", None, "mp4");

                engine
                    .write_file(&list, Bytes::from(concat_list(&ctx.clips)))
                    .await
                    .map_err(|e| Error::render(NAME, e.to_string()))?;
                let result = engine.exec(&concat_args(&list, &joined)).await;

                let mut used = vec![list];
                used.extend(ctx.clips.iter().cloned());
                discard(engine, &used).await;

                let out = result.map_err(|e| Error::render(NAME, e.to_string()))?;
                if !out.success() {
                    discard(engine, &[joined]).await;
                    return Err(Error::render(
                        NAME,
                        format!("joining {n} clips failed: {}", out.last_log_line()),
                    ));
                }
                ctx.log.info(NAME, format!("joined {n} clips"));
                ctx.video = Some(joined);
                Ok(())
            }
        }
    }
}
