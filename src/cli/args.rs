//! CLI argument definitions using clap
//!
//! Commands:
//! - aerodb-migrate migrate --config <path>
//! - aerodb-migrate shards --config <path>
//! - aerodb-migrate series --config <path> --shard <name> --database <db>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Migrates legacy AeroDB shards into a live cluster
#[derive(Parser, Debug)]
#[command(name = "aerodb-migrate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Migrate every legacy shard, newest first.
    ///
    /// Runs are not resumable: running twice writes every point twice.
    Migrate {
        /// Path to configuration file
        #[arg(long, default_value = "./aerodb-migrate.json")]
        config: PathBuf,
    },

    /// List legacy shards in migration order
    Shards {
        /// Path to configuration file
        #[arg(long, default_value = "./aerodb-migrate.json")]
        config: PathBuf,
    },

    /// List the series of one database in one shard
    Series {
        /// Path to configuration file
        #[arg(long, default_value = "./aerodb-migrate.json")]
        config: PathBuf,

        /// Shard directory name
        #[arg(long)]
        shard: String,

        /// Database name
        #[arg(long)]
        database: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
