use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "shears", version, about = "Batch image and file operations")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "SHEARS_CONFIG")]
    pub config: Option<PathBuf>,
    /// More logging (-v for debug, -vv for trace); `RUST_LOG` takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Re-encode images at a lower quality, keeping their format
    Compress {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        output: Output,
        /// 1-100; anything else uses the configured default
        #[arg(short, long, allow_negative_numbers = true)]
        quality: Option<i64>,
    },
    /// Convert images to jpg, png or bmp
    Convert {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        output: Output,
        /// Target format for every path
        #[arg(short, long)]
        to: String,
    },
    /// Cut a rectangle out of one image
    Crop {
        file: PathBuf,
        #[command(flatten)]
        output: Output,
        #[arg(long, default_value_t = 0)]
        left: u32,
        #[arg(long, default_value_t = 0)]
        top: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Stamp a short text onto one image
    Watermark {
        file: PathBuf,
        /// At most 10 characters
        #[arg(short, long)]
        text: String,
        #[command(flatten)]
        output: Output,
        #[command(flatten)]
        style: Style,
    },
    /// Give a file or folder a new name in place
    Rename {
        path: PathBuf,
        /// New base name; a file keeps its extension if none is given
        new_name: String,
    },
    /// Delete files and folders, repairing permissions if needed
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Create (if needed) and print an output directory
    Resolve { dir: PathBuf },
}

#[derive(Debug, Args)]
pub struct Output {
    /// Directory receiving the generated files; created if missing
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct Style {
    /// Font size in pixels; scales with the image when omitted
    #[arg(long)]
    pub font_size: Option<u32>,
    /// Any SVG color (`#fff`, `rgba(0,0,0,0.4)`)
    #[arg(long)]
    pub color: Option<String>,
    /// Clockwise rotation in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub angle: Option<f64>,
    /// top-left, top-right, bottom-left, bottom-right or center
    #[arg(long, conflicts_with_all = ["x_ratio", "y_ratio"])]
    pub position: Option<String>,
    /// Horizontal position as a fraction of the width (0-1)
    #[arg(long, requires = "y_ratio")]
    pub x_ratio: Option<f64>,
    /// Vertical position as a fraction of the height (0-1)
    #[arg(long, requires = "x_ratio")]
    pub y_ratio: Option<f64>,
}
