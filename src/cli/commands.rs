//! CLI command implementations
//!
//! Each command loads and validates the configuration, does its work and
//! writes one JSON response to stdout.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::cluster::LocalClusterWriter;
use crate::migration::DataMigrator;
use crate::observability::{log_event, Event, Logger, MetricsSnapshot};
use crate::shard::{Shard, ShardEnumerator, ShardOpener, StoreShardOpener};

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Migrate { config } => migrate(&config),
        Command::Shards { config } => shards(&config),
        Command::Series {
            config,
            shard,
            database,
        } => series(&config, &shard, &database),
    }
}

fn load(config_path: &Path) -> CliResult<Config> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log_severity()?);
    log_event(
        Event::ConfigLoaded,
        &[
            ("config", config_path.display().to_string()),
            ("base_dir", config.base_dir.clone()),
            ("target_dir", config.target_dir.clone()),
        ],
    );
    Ok(config)
}

/// Migrate every legacy shard and print the run counters
pub fn migrate(config_path: &Path) -> CliResult<()> {
    let config = load(config_path)?;
    let snapshot = run_migration(&config)?;
    write_response(serde_json::to_value(snapshot)?)
}

/// Runs the migration described by `config` on a fresh runtime.
pub fn run_migration(config: &Config) -> CliResult<MetricsSnapshot> {
    let cluster = Arc::new(config.cluster.clone());
    let writer = Arc::new(LocalClusterWriter::new(
        config.target_path(),
        Arc::clone(&cluster),
        config.shard_options(),
    ));
    let opener = Arc::new(StoreShardOpener::new(
        config.shard_root(),
        config.shard_options(),
    ));

    let migrator = DataMigrator::new(
        ShardEnumerator::new(config.shard_root()),
        opener,
        cluster,
        writer.clone(),
        config.stream_options(),
    )
    .map_err(|e| CliError::config_error(e.to_string()))?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime_error(format!("Failed to create tokio runtime: {}", e)))?;

    let result = rt.block_on(migrator.migrate());
    writer.close();
    result.map_err(|e| CliError::migration_failed(e.to_string()))
}

/// Print shard names in migration order
pub fn shards(config_path: &Path) -> CliResult<()> {
    let config = load(config_path)?;
    write_response(json!(list_shards(&config)?))
}

/// Shard names under the configured root, newest first.
pub fn list_shards(config: &Config) -> CliResult<Vec<String>> {
    ShardEnumerator::new(config.shard_root())
        .shards()
        .map_err(|e| CliError::shard_error(e.to_string()))
}

/// Print the series of `database` stored in `shard`
pub fn series(config_path: &Path, shard: &str, database: &str) -> CliResult<()> {
    let config = load(config_path)?;
    let names = list_series(&config, shard, database)?;
    write_response(json!({
        "shard": shard,
        "database": database,
        "series": names,
    }))
}

/// Series of `database` in an existing shard.
///
/// A missing shard is an error rather than being created, and opening an
/// existing shard writes nothing into it.
pub fn list_series(config: &Config, shard: &str, database: &str) -> CliResult<Vec<String>> {
    if !config.shard_root().join(shard).is_dir() {
        return Err(CliError::shard_error(format!("Shard not found: {}", shard)));
    }

    let opener = StoreShardOpener::new(config.shard_root(), config.shard_options());
    let opened = opener
        .open(shard)
        .map_err(|e| CliError::shard_error(e.to_string()))?;
    let result = opened.series_for_database(database);
    opened.close();

    let mut names = result.map_err(|e| CliError::shard_error(e.to_string()))?;
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use crate::protocol::{FieldValue, Point, Series};
    use crate::shard::{LegacyShard, ShardOptions};
    use std::fs;
    use tempfile::TempDir;

    fn config(temp_dir: &TempDir) -> Config {
        serde_json::from_value(json!({
            "base_dir": temp_dir.path().join("legacy").to_string_lossy(),
            "target_dir": temp_dir.path().join("cluster").to_string_lossy(),
            "log_level": "FATAL",
            "cluster": {
                "databases": ["db_a"],
                "cluster_admins": [{"name": "root"}]
            }
        }))
        .unwrap()
    }

    fn seed(config: &Config, shard: &str, series: &str, points: usize) {
        let store = LegacyShard::open(
            shard,
            &config.shard_root().join(shard),
            &ShardOptions::default(),
        )
        .unwrap();
        let batch = Series::with_points(
            series,
            vec!["value".into()],
            (0..points)
                .map(|i| Point::new(i as i64, 0, vec![Some(FieldValue::Int(i as i64))]))
                .collect(),
        );
        store.write_series("db_a", &batch).unwrap();
        store.close();
    }

    #[test]
    fn test_list_shards_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir);
        seed(&config, "shard_1", "cpu", 1);
        seed(&config, "shard_2", "cpu", 1);

        assert_eq!(list_shards(&config).unwrap(), vec!["shard_2", "shard_1"]);
    }

    #[test]
    fn test_list_shards_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let err = list_shards(&config(&temp_dir)).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ShardError);
    }

    #[test]
    fn test_list_series_does_not_create_shards() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir);
        seed(&config, "shard_1", "temp", 2);

        assert_eq!(list_series(&config, "shard_1", "db_a").unwrap(), vec!["temp"]);
        assert!(list_series(&config, "shard_9", "db_a").is_err());
        assert!(!config.shard_root().join("shard_9").exists());
    }

    #[test]
    fn test_list_series_leaves_empty_shard_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir);
        let empty = config.shard_root().join("shard_0");
        fs::create_dir_all(&empty).unwrap();

        assert!(list_series(&config, "shard_0", "db_a").unwrap().is_empty());
        assert_eq!(fs::read_dir(&empty).unwrap().count(), 0);
    }

    #[test]
    fn test_run_migration_copies_points() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir);
        seed(&config, "shard_1", "temp", 3);

        let snapshot = run_migration(&config).unwrap();
        assert_eq!(snapshot.shards_opened, 1);
        assert_eq!(snapshot.shards_closed, 1);
        assert_eq!(snapshot.points_written, 3);
        assert!(config.target_path().join("db_a").is_dir());
    }

    #[test]
    fn test_run_migration_missing_root_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = run_migration(&config(&temp_dir)).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::MigrationFailed);
    }
}
