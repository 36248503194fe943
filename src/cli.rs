// CLI definitions using clap

use clap::{Parser, Subcommand};
use hid_decode::OutputFormat;
use hid_event::PointerWidth;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hid-decode")]
#[command(author, version, about = "Decode raw-input HID notifications")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: <config dir>/hid-decode/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Pointer width of the process that captured the images (32 or 64)
    #[arg(long, global = true, value_parser = parse_pointer_width)]
    pub pointer_width: Option<PointerWidth>,

    /// Show raw hex dump alongside decoded output
    #[arg(long, global = true)]
    pub hex: bool,

    /// Show the decoder's diagnostic trace
    #[arg(long, global = true)]
    pub trace: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode every notification of a TOML capture
    #[command(visible_alias = "r")]
    Replay {
        /// Capture file
        file: PathBuf,
    },

    /// Show the report slices of one raw input image
    #[command(visible_alias = "w")]
    Walk {
        /// Raw input image as hex (e.g. "02000000 2A000000 ...")
        hex: String,
    },

    /// Write the default config file
    InitConfig {
        /// Where to write (default: the standard config path)
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_pointer_width(s: &str) -> Result<PointerWidth, String> {
    match s {
        "32" => Ok(PointerWidth::Bits32),
        "64" => Ok(PointerWidth::Bits64),
        other => Err(format!("expected 32 or 64, got {other}")),
    }
}
