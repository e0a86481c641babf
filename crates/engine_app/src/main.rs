//! # engine_app — offline inspector
//!
//! Decodes entity envelopes, save documents and prefab instances against the
//! stock type table and prints what they restore to.
//!
//! ```text
//! engine_app types
//! engine_app sample world.bin --format save
//! engine_app inspect world.bin --format save --filter persist --pretty
//! ```

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::parse();
    let registry = engine_defaults::default_registry().context("building the type registry")?;

    match config.command {
        Command::Types => print!("{}", commands::list_types(&registry)),
        Command::Inspect {
            path,
            format,
            filter,
            pretty,
        } => {
            let blob = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            info!(path = %path.display(), bytes = blob.len(), ?format, "inspecting");
            print!("{}", commands::inspect(&registry, &blob, format, filter, pretty)?);
        }
        Command::Sample { out, format } => {
            let blob = commands::sample(&registry, format)?;
            std::fs::write(&out, &blob).with_context(|| format!("writing {}", out.display()))?;
            info!(path = %out.display(), bytes = blob.len(), ?format, "wrote sample");
        }
    }
    Ok(())
}
