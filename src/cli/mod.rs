//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::{Config, DatabaseConfig, TableConfig};
use crate::database::{Adapter, MySqlAdapter, MySqlConnectOptions};
use crate::manager::{DdlOutcome, PartitionsManager};
use crate::telemetry;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "oxpartition")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, help = "Path to the TOML configuration file")]
    pub config: PathBuf,

    #[arg(
        short,
        long,
        global = true,
        help = "Only operate on this table (defaults to every configured table)"
    )]
    pub table: Option<String>,

    #[arg(long, global = true, help = "Print the DDL instead of executing it")]
    pub dry_run: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, help = "Log filter, e.g. 'debug' (defaults to RUST_LOG or info)")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "status", about = "Show the current partitions")]
    Status,

    #[command(name = "init", about = "Partition an unpartitioned table")]
    Init,

    #[command(name = "append", about = "Append partitions up to days_into_future")]
    Append,

    #[command(name = "drop", about = "Drop old partitions")]
    Drop(DropArgs),

    #[command(name = "advance", about = "Drop old partitions and append new ones in one pass")]
    Advance,
}

#[derive(Parser, Debug)]
pub struct DropArgs {
    #[arg(
        long,
        help = "Drop partitions older than this many days (defaults to drop_older_than_days)"
    )]
    pub older_than_days: Option<i64>,
}

mod advance;
mod append;
mod drop;
mod init;
mod status;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_logging(cli.log_level.as_deref());

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    let adapter = connect(&config.database).await?;

    for (name, table) in selected_tables(&cli, &config)? {
        let manager = build_manager(adapter.clone(), name, table, &config.database)?;
        let result = match &cli.command {
            Commands::Status => status::execute(&cli, &manager).await,
            Commands::Init => init::execute(&cli, &manager, table).await,
            Commands::Append => append::execute(&cli, &manager, table).await,
            Commands::Drop(args) => drop::execute(&cli, args, &manager, table).await,
            Commands::Advance => advance::execute(&cli, manager, table).await,
        };
        result.with_context(|| format!("Table '{}'", name))?;
    }

    Ok(())
}

async fn connect(database: &DatabaseConfig) -> Result<Arc<dyn Adapter>> {
    let options = MySqlConnectOptions {
        overall_timeout: Duration::from_secs(database.connect_timeout_secs),
        ..Default::default()
    };
    let adapter = MySqlAdapter::connect(database.url.expose_secret(), options)
        .await
        .with_context(|| format!("Failed to connect to {}", database.redacted_url()))?;
    Ok(Arc::new(adapter))
}

fn selected_tables<'a>(cli: &Cli, config: &'a Config) -> Result<Vec<(&'a str, &'a TableConfig)>> {
    match &cli.table {
        Some(name) => {
            let (name, table) = config
                .tables
                .get_key_value(name.as_str())
                .with_context(|| format!("Table '{}' is not configured", name))?;
            Ok(vec![(name.as_str(), table)])
        }
        None => {
            if config.tables.is_empty() {
                anyhow::bail!("No tables configured in {}", cli.config.display());
            }
            Ok(config
                .tables
                .iter()
                .map(|(name, table)| (name.as_str(), table))
                .collect())
        }
    }
}

fn build_manager(
    adapter: Arc<dyn Adapter>,
    name: &str,
    table: &TableConfig,
    database: &DatabaseConfig,
) -> Result<PartitionsManager> {
    let manager = PartitionsManager::new(adapter, name, table.time_unit)?;
    Ok(match database.lock_wait_timeout_secs {
        Some(timeout_secs) => manager.with_lock_wait_timeout(timeout_secs),
        None => manager,
    })
}

/// 输出一次操作的结果
fn report<T: Serialize>(
    cli: &Cli,
    table: &str,
    label: &str,
    result: &T,
    outcome: &DdlOutcome,
) -> Result<()> {
    if cli.json {
        let value = json_report(table, label, result)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match outcome {
        DdlOutcome::Skipped => println!("[{}] {}: nothing to do", table, label),
        DdlOutcome::DryRun(sql) => println!("[{}] {} (dry run):\n{}", table, label, sql),
        DdlOutcome::Executed(sql) => println!("[{}] {} executed:\n{}", table, label, sql),
    }
    Ok(())
}

fn json_report<T: Serialize>(table: &str, label: &str, result: &T) -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "table": table,
        "command": label,
        "result": serde_json::to_value(result)?,
    }))
}
