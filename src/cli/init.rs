use crate::cli::{report, Cli};
use crate::config::TableConfig;
use crate::manager::PartitionsManager;
use anyhow::Result;

pub async fn execute(cli: &Cli, manager: &PartitionsManager, table: &TableConfig) -> Result<()> {
    let applied = manager
        .initialize_partitioning_in_intervals(
            table.partition_unit,
            table.partition_size,
            table.days_into_future,
            cli.dry_run,
        )
        .await?;
    report(cli, manager.table_name(), "init", &applied, &applied.outcome)
}
