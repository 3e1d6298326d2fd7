use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "storyreel",
    author,
    version,
    about = "Timeline playback and MP4 export for video projects"
)]
pub struct Cli {
    /// JSON settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug/trace level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a project's timeline to an MP4 file
    Export {
        project: PathBuf,

        #[arg(short, long, default_value = "export.mp4")]
        output: PathBuf,
    },

    /// Print the segment active on each track at a program time
    Resolve {
        project: PathBuf,

        /// Seconds from the start of the program
        #[arg(long, default_value_t = 0.0)]
        at: f64,

        #[arg(long)]
        json: bool,
    },

    /// Report where ffmpeg and ffprobe were found
    CheckTools,

    /// Check a settings file and, optionally, a project file
    Validate {
        config: Option<PathBuf>,

        #[arg(long)]
        project: Option<PathBuf>,
    },

    /// Print the version
    Version,
}
