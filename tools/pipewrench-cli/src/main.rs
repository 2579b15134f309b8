//! PipeWrench CLI: X11 window and screen capture from the terminal.
//!
//! Usage:
//!   pipewrench windows                 List capturable windows
//!   pipewrench screens                 List detected screens
//!   pipewrench capture window [OPTS]   Capture one window
//!   pipewrench capture screen <INDEX>  Capture one screen
//!   pipewrench recent                  List stored captures
//!   pipewrench watch                   Watch for window-list changes
//!   pipewrench check                   Check the capture environment

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "pipewrench",
    about = "X11 window and screen capture toolkit",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List capturable windows
    Windows,

    /// List detected screens
    Screens,

    /// Capture a window or a screen to an image file
    Capture {
        #[command(subcommand)]
        target: CaptureTarget,
    },

    /// List stored captures, newest first
    Recent {
        /// Maximum number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Watch the window list and print one line per change
    Watch {
        /// Event poll interval in milliseconds
        #[arg(long, default_value = "100")]
        interval_ms: u64,
    },

    /// Check the capture environment
    Check,
}

#[derive(Subcommand)]
enum CaptureTarget {
    /// Capture one window, picked by id or title substring
    Window {
        /// Window id as listed by `pipewrench windows` (hex or decimal)
        #[arg(long, conflicts_with = "title")]
        id: Option<String>,

        /// Pick the first window whose title contains this text
        #[arg(long)]
        title: Option<String>,

        /// Output format: png or jpeg
        #[arg(long)]
        format: Option<String>,

        /// JPEG quality (1-100)
        #[arg(long)]
        quality: Option<u8>,

        /// Seconds to wait before capturing
        #[arg(long)]
        delay: Option<u64>,

        /// Directory to write into (defaults to the configured one)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Also write the publish envelope JSON to this path
        #[arg(long)]
        envelope: Option<PathBuf>,
    },

    /// Capture one screen by index (-1 captures all screens)
    Screen {
        /// Screen index as listed by `pipewrench screens`
        #[arg(allow_hyphen_values = true)]
        index: i32,

        /// Output format: png or jpeg
        #[arg(long)]
        format: Option<String>,

        /// JPEG quality (1-100)
        #[arg(long)]
        quality: Option<u8>,

        /// Seconds to wait before capturing
        #[arg(long)]
        delay: Option<u64>,

        /// Directory to write into (defaults to the configured one)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Also write the publish envelope JSON to this path
        #[arg(long)]
        envelope: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    pipewrench_common::logging::init_logging(&pipewrench_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Windows => commands::windows::run(),
        Commands::Screens => commands::screens::run(),
        Commands::Capture { target } => match target {
            CaptureTarget::Window {
                id,
                title,
                format,
                quality,
                delay,
                output_dir,
                envelope,
            } => {
                commands::capture::run_window(id, title, format, quality, delay, output_dir, envelope)
                    .await
            }
            CaptureTarget::Screen {
                index,
                format,
                quality,
                delay,
                output_dir,
                envelope,
            } => {
                commands::capture::run_screen(index, format, quality, delay, output_dir, envelope)
                    .await
            }
        },
        Commands::Recent { limit } => commands::recent::run(limit),
        Commands::Watch { interval_ms } => commands::watch::run(interval_ms).await,
        Commands::Check => commands::check::run(),
    }
}
