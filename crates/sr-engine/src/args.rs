//! Argument vectors and filter graphs in ffmpeg's grammar.
//!
//! These strings are the contract with the engine: the render stages build
//! every command through this module.

use sr_core::config::RenderConfig;
use sr_core::MediaKind;

/// Letterbox into `width`x`height`, square pixels, fixed rate and pixel format.
pub fn scale_pad_filter(cfg: &RenderConfig) -> String {
    let (w, h) = (cfg.width, cfg.height);
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,\
         pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format={pix}",
        fps = cfg.fps,
        pix = cfg.pixel_format,
    )
}

/// Seconds with millisecond precision, as ffmpeg accepts for `-t`.
pub fn secs_arg(secs: f64) -> String {
    format!("{secs:.3}")
}

/// Normalize one main-track source into a video-only intermediate clip.
///
/// Images are looped into a still clip of `duration` seconds; videos are
/// cut to `duration` seconds and re-encoded.
pub fn normalize_args(
    input: &str,
    output: &str,
    kind: MediaKind,
    duration: f64,
    cfg: &RenderConfig,
) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    if kind == MediaKind::Image {
        args.extend([
            "-loop".into(),
            "1".into(),
            "-framerate".into(),
            cfg.fps.to_string(),
            "-t".into(),
            secs_arg(duration),
            "-i".into(),
            input.into(),
        ]);
    } else {
        args.extend(["-i".into(), input.into(), "-t".into(), secs_arg(duration)]);
    }
    args.extend([
        "-vf".into(),
        scale_pad_filter(cfg),
        "-c:v".into(),
        cfg.video_codec.clone(),
        "-preset".into(),
        cfg.preset.clone(),
        "-pix_fmt".into(),
        cfg.pixel_format.clone(),
        "-r".into(),
        cfg.fps.to_string(),
        "-an".into(),
        output.into(),
    ]);
    args
}

/// Concat-demuxer list: one `file '<name>'` line per clip, in order.
pub fn concat_list<S: AsRef<str>>(clips: &[S]) -> String {
    clips
        .iter()
        .map(|c| format!("file '{}'\n", c.as_ref().replace('\'', r"'\''")))
        .collect()
}

/// Clip names from a concat list, in order. Lines that are not `file`
/// directives are ignored.
pub fn parse_concat_list(list: &str) -> Vec<String> {
    list.lines()
        .filter_map(|line| line.trim().strip_prefix("file "))
        .map(|rest| {
            let rest = rest.trim();
            let inner = rest
                .strip_prefix('\'')
                .and_then(|r| r.strip_suffix('\''))
                .unwrap_or(rest);
            inner.replace(r"'\''", "'")
        })
        .collect()
}

/// Join clips listed in `list` without re-encoding.
pub fn concat_args(list: &str, output: &str) -> Vec<String> {
    ["-f", "concat", "-safe", "0", "-i", list, "-c", "copy", output]
        .into_iter()
        .map(String::from)
        .collect()
}

/// `adelay` for both channels of one input.
pub fn delay_filter(delay_ms: i64) -> String {
    let ms = delay_ms.max(0);
    format!("adelay={ms}|{ms}")
}

/// Filter graph mixing audio inputs `1..=n` (input 0 is the video) after
/// delaying each by its offset. The result is labelled `[aout]`. Inputs are
/// summed as-is.
pub fn mix_filter_graph(delays_ms: &[i64]) -> String {
    let mut graph = String::new();
    let mut labels = String::new();
    for (i, ms) in delays_ms.iter().enumerate() {
        graph.push_str(&format!("[{}:a]{},apad[a{i}];", i + 1, delay_filter(*ms)));
        labels.push_str(&format!("[a{i}]"));
    }
    graph.push_str(&format!(
        "{labels}amix=inputs={}:normalize=0[aout]",
        delays_ms.len()
    ));
    graph
}

/// Decode the first audio stream of `input` and discard it. Fails when the
/// input has no audio stream or the stream cannot be decoded.
pub fn decode_check_args(input: &str) -> Vec<String> {
    ["-i", input, "-map", "0:a:0", "-f", "null", "-"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Mux the delayed audio mix under `video`, copying the video stream.
pub fn mix_args(
    video: &str,
    audio_inputs: &[(String, i64)],
    output: &str,
    cfg: &RenderConfig,
) -> Vec<String> {
    let mut args = vec!["-i".to_string(), video.to_string()];
    for (name, _) in audio_inputs {
        args.push("-i".into());
        args.push(name.clone());
    }
    let delays: Vec<i64> = audio_inputs.iter().map(|(_, ms)| *ms).collect();
    args.extend([
        "-filter_complex".into(),
        mix_filter_graph(&delays),
        "-map".into(),
        "0:v".into(),
        "-map".into(),
        "[aout]".into(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        cfg.audio_codec.clone(),
        "-b:a".into(),
        cfg.audio_bitrate.clone(),
        "-shortest".into(),
        output.into(),
    ]);
    args
}

/// File extension for an engine input holding the bytes at `location`.
///
/// ffmpeg picks image demuxers by extension, so this looks at the data-URI
/// mime type or the path before falling back to `kind`.
pub fn source_extension(location: &str, kind: MediaKind) -> String {
    let from_location = if let Some(rest) = location.strip_prefix("data:") {
        let mime = rest.split([';', ',']).next().unwrap_or("");
        mime.split('/').nth(1).map(mime_subtype_extension)
    } else {
        let path = location.split(['?', '#']).next().unwrap_or("");
        // Drop scheme and host so "https://example.com" has no extension.
        let path = match path.split_once("://") {
            Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
            None => path,
        };
        let file = path.rsplit('/').next().unwrap_or("");
        file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
    };

    from_location
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| kind.default_extension().to_string())
}

fn mime_subtype_extension(subtype: &str) -> String {
    match subtype.to_ascii_lowercase().as_str() {
        "jpeg" | "pjpeg" => "jpg".into(),
        "mpeg" | "mp3" => "mp3".into(),
        "quicktime" => "mov".into(),
        "x-wav" | "wave" | "wav" => "wav".into(),
        "x-matroska" => "mkv".into(),
        "svg+xml" => "svg".into(),
        other => other.to_string(),
    }
}
