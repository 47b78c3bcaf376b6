//! CLI module for aerodb-migrate
//!
//! Provides command-line interface for:
//! - migrate: one-shot migration of every legacy shard
//! - shards: list shards in migration order
//! - series: list the series of a database in a shard

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{list_series, list_shards, migrate, run, run_command, run_migration, series, shards};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_response};
