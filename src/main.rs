//! hid-decode CLI
//!
//! Replays captured raw input notifications through the HID event decoder.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::Parser;
use hid_decode::{DecoderConfig, Overrides, Printer, ReplaySession};
use hid_event::RawEnvelope;
use tracing::{debug, info};

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if cli.verbose {
        filter = filter
            .add_directive("hid_event=debug".parse()?)
            .add_directive("hid_decode=debug".parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(DecoderConfig::default_path);
    let overrides = Overrides {
        format: cli.format,
        pointer_width: cli.pointer_width,
        hex: cli.hex,
        trace: cli.trace,
    };

    match cli.command {
        Commands::Replay { file } => {
            let config = DecoderConfig::load(&config_path)?.apply(&overrides);
            debug!(?config, "Replaying {}", file.display());
            let session = ReplaySession::load(&file, config.layout)?;
            let records = session.run()?;

            let printer = Printer::from_config(&config.output);
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for record in &records {
                printer.print_record(&mut out, record)?;
            }
            printer.print_summary(&mut out, &records)?;
            out.flush()?;
        }
        Commands::Walk { hex } => {
            let config = DecoderConfig::load(&config_path)?.apply(&overrides);
            let image = hid_decode::parse_hex(&hex).context("Invalid image")?;
            let envelope = RawEnvelope::parse(&image, config.layout)?;
            let printer = Printer::from_config(&config.output);
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            printer.print_walk(&mut out, &envelope)?;
            out.flush()?;
        }
        Commands::InitConfig { path, force } => {
            let path = path.unwrap_or(config_path);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            DecoderConfig::default().apply(&overrides).save(&path)?;
            info!("Wrote {}", path.display());
            println!("{}", path.display());
        }
    }

    Ok(())
}
