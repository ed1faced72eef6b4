use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use vidbyte::config::{MAX_DIMENSION, MIN_DIMENSION};
use vidbyte::pipeline;
use vidbyte::video::ffmpeg::FfmpegPaths;
use vidbyte::{SafetyMode, VidbyteConfig};

/// vidbyte — store any file inside a playable video.
#[derive(Parser)]
#[command(name = "vidbyte", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file into a video
    Encode {
        /// Input file path
        input: PathBuf,

        /// Output video path (defaults to the input name with .mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force an even square resolution instead of auto-sizing
        #[arg(short, long, value_parser = parse_resolution)]
        resolution: Option<u32>,

        /// Pixel encoding: fullspace is densest and assumes a lossless
        /// transport; monospace and threespace tolerate color drift
        #[arg(short, long, value_enum, default_value = "fullspace")]
        safety: SafetyMode,
    },

    /// Extract the original file from a video
    Decode {
        /// Input video path
        input: PathBuf,

        /// Output file path (defaults to the video name with the extension
        /// recorded in the stream)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_resolution(value: &str) -> Result<u32, String> {
    let numeric: u32 = value
        .parse()
        .map_err(|_| "resolution must be an integer".to_string())?;
    if numeric % 2 != 0 || !(MIN_DIMENSION..=MAX_DIMENSION).contains(&numeric) {
        return Err(format!(
            "resolution must be an even integer between {MIN_DIMENSION} and {MAX_DIMENSION}"
        ));
    }
    Ok(numeric)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let paths = FfmpegPaths::resolve()?;

    match cli.command {
        Commands::Encode {
            input,
            output,
            resolution,
            safety,
        } => {
            let cfg = VidbyteConfig {
                safety,
                forced_dimension: resolution,
            };
            pipeline::encode::encode_file(&input, output.as_deref(), &cfg, &paths)?;
        }

        Commands::Decode { input, output } => {
            pipeline::decode::decode_file(&input, output.as_deref(), &paths)?;
        }
    }

    Ok(())
}
