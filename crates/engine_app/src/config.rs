//! Command-line configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use engine_component::PropertyFlags;

/// Parsed command line. The log filter comes from `RUST_LOG`.
#[derive(Debug, Parser)]
#[command(name = "engine_app", about = "Inspect entity wire blobs, save files and prefabs")]
pub struct AppConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the registered component types and their fields.
    Types,

    /// Decode a blob and print the entities it restores as JSON.
    Inspect {
        /// Path to the blob.
        path: PathBuf,

        /// Layout of the blob.
        #[arg(short, long, value_enum, default_value_t = BlobFormat::Envelope)]
        format: BlobFormat,

        /// Which fields to print.
        #[arg(long, value_enum, default_value_t = Pass::Persist)]
        filter: Pass,

        /// Indent the JSON output.
        #[arg(short, long)]
        pretty: bool,
    },

    /// Write a sample blob built from the stock components.
    Sample {
        /// Destination path.
        out: PathBuf,

        #[arg(short, long, value_enum, default_value_t = BlobFormat::Envelope)]
        format: BlobFormat,
    },
}

/// Blob layouts understood by `inspect` and produced by `sample`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlobFormat {
    /// A single replicated entity envelope.
    Envelope,
    /// A multi-entity save document.
    Save,
    /// A prefab-spawned entity stored as diffs.
    Prefab,
}

/// Participation class used to filter printed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pass {
    Replicate,
    Persist,
    Editor,
}

impl Pass {
    #[must_use]
    pub fn flag(self) -> PropertyFlags {
        match self {
            Self::Replicate => PropertyFlags::REPLICATE,
            Self::Persist => PropertyFlags::PERSIST,
            Self::Editor => PropertyFlags::EDITOR,
        }
    }
}
