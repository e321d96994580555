//! CLI argument definitions using clap
//!
//! Commands:
//! - arczone init --config <path>
//! - arczone apply --config <path>
//! - arczone buckets --config <path>
//! - arczone versions --config <path> --bucket <id> --key <key>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// arczone - archive zone replication policy engine
#[derive(Parser, Debug)]
#[command(name = "arczone")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new archive data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./arczone.json")]
        config: PathBuf,
    },

    /// Apply mutation events read from stdin, one JSON object per line
    Apply {
        /// Path to configuration file
        #[arg(long, default_value = "./arczone.json")]
        config: PathBuf,
    },

    /// List every bucket record, retired generations included
    Buckets {
        /// Path to configuration file
        #[arg(long, default_value = "./arczone.json")]
        config: PathBuf,
    },

    /// List the retained versions of one key, newest first
    Versions {
        /// Path to configuration file
        #[arg(long, default_value = "./arczone.json")]
        config: PathBuf,

        /// Archive bucket id, or the logical name of an ACTIVE bucket
        #[arg(long)]
        bucket: String,

        /// Object key
        #[arg(long)]
        key: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
