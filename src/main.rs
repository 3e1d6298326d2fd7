mod cli;

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};

use storyreel::core::config::Config;
use storyreel::core::events::EventPayload;
use storyreel::core::{format_timecode, Track};
use storyreel::engine::ToolRegistry;
use storyreel::playback::resolve;
use storyreel::timeline::Project;
use storyreel::Studio;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let directives = match std::env::var("RUST_LOG") {
        Ok(directives) => directives,
        Err(_) if cli.verbose => [
            "storyreel=trace",
            "sr_core=debug",
            "sr_timeline=debug",
            "sr_playback=debug",
            "sr_engine=debug",
            "sr_render=debug",
        ]
        .join(","),
        Err(_) => "storyreel=info,sr_render=info,sr_engine=info".to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(directives.as_str())
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Export { project, output } => {
            run_export(&project, &output, cli.config.as_deref())
        }
        Commands::Resolve { project, at, json } => resolve_at(&project, at, json),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
            project,
        } => {
            let path = config_path.or(cli.config);
            validate(path.as_deref(), project.as_deref())
        }
        Commands::Version => {
            println!("storyreel {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("storyreel: {e:#}");
            let code = match e.downcast_ref::<storyreel::core::Error>() {
                Some(err) => err.exit_code(),
                None => 1,
            };
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

fn run_export(project_path: &Path, output: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let project = Project::load(project_path)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let mut studio = Studio::from_config(config)?;
        studio.load_project(project);

        let mut rx = studio.events().subscribe();
        let printer = tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if let EventPayload::ExportProgress { progress, stage, .. } = event.payload {
                    eprintln!("[{:>3.0}%] {stage}", progress * 100.0);
                }
            }
        });

        let result = studio.export().await;
        printer.abort();
        let out = result?;

        std::fs::write(output, &out.data)
            .with_context(|| format!("writing {}", output.display()))?;

        for line in out.log.lines() {
            println!("{line}");
        }
        println!(
            "Wrote {} ({} bytes): {} clips, {} skipped, audio {}",
            output.display(),
            out.data.len(),
            out.clips_rendered,
            out.clips_skipped,
            if out.audio_mixed { "mixed" } else { "none" }
        );
        Ok::<(), anyhow::Error>(())
    })
}

fn resolve_at(project_path: &Path, at: f64, json: bool) -> Result<()> {
    let project = Project::load(project_path)?;
    let (_, store) = project.into_parts();
    let active = resolve(at, store.segments());

    if json {
        let mut tracks = serde_json::Map::new();
        for track in Track::ALL {
            tracks.insert(track.to_string(), serde_json::to_value(active.on(track))?);
        }
        let doc = serde_json::json!({
            "time": at,
            "frame": active.frame,
            "tracks": tracks,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Time: {} (frame {})", format_timecode(at), active.frame);
    for track in Track::ALL {
        match active.on(track) {
            Some(seg) => println!(
                "  {track}: {} ({}) [{}, {})",
                seg.location, seg.kind, seg.start_frame, seg.end_frame
            ),
            None => println!("  {track}: -"),
        }
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    let report = ToolRegistry::discover(&config.tools).check_all();

    for tool in &report {
        let mark = if tool.available { "ok  " } else { "MISSING" };
        let mut line = format!("{mark} {}", tool.name);
        if let Some(path) = &tool.path {
            line.push_str(&format!("  {}", path.display()));
        }
        if let Some(version) = &tool.version {
            line.push_str(&format!("  [{version}]"));
        }
        println!("{line}");
    }

    if report.iter().any(|t| !t.available) {
        println!("\nexport needs ffmpeg built with libx264; set tools.ffmpeg_path if it is not on PATH");
    }
    Ok(())
}

fn validate(config_path: Option<&Path>, project_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("reading {}", p.display()))?;
            let config = Config::from_json(&text)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };
    println!(
        "  Render: {}x{} @ {} fps ({}, {})",
        config.render.width,
        config.render.height,
        config.render.fps,
        config.render.video_codec,
        config.render.pixel_format
    );
    println!(
        "  Playback: {} Hz, drift tolerance {}s",
        config.playback.tick_hz, config.playback.drift_tolerance_secs
    );
    for warning in config.validate() {
        println!("  ⚠ {warning}");
    }

    if let Some(p) = project_path {
        println!("Validating project: {}", p.display());
        let project = Project::load(p)?;
        println!(
            "✓ Project is readable: {} assets, {} segments",
            project.assets.len(),
            project.segments.len()
        );
        for warning in project.validate() {
            println!("  ⚠ {warning}");
        }
    }

    Ok(())
}
