use crate::cli::{report, Cli, DropArgs};
use crate::config::TableConfig;
use crate::manager::PartitionsManager;
use anyhow::{Context, Result};

pub async fn execute(
    cli: &Cli,
    args: &DropArgs,
    manager: &PartitionsManager,
    table: &TableConfig,
) -> Result<()> {
    let days = args
        .older_than_days
        .or(table.drop_older_than_days)
        .context("--older-than-days is required when drop_older_than_days is not configured")?;

    let applied = manager
        .drop_partitions_older_than_in_days(days, cli.dry_run)
        .await?;
    report(cli, manager.table_name(), "drop", &applied, &applied.outcome)
}
