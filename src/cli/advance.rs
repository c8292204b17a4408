use crate::advanced::AdvancedPartitionsManager;
use crate::cli::{report, Cli};
use crate::config::TableConfig;
use crate::manager::PartitionsManager;
use anyhow::{Context, Result};

pub async fn execute(cli: &Cli, manager: PartitionsManager, table: &TableConfig) -> Result<()> {
    let drop_older_than_days = table
        .drop_older_than_days
        .context("advance requires drop_older_than_days in the table configuration")?;

    let advanced = AdvancedPartitionsManager::new(manager);
    let outcome = advanced
        .manage_partitions_by(
            table.window_step(),
            drop_older_than_days,
            table.days_into_future,
            cli.dry_run,
        )
        .await?;

    let table_name = advanced.manager().table_name();
    if cli.json {
        return report(cli, table_name, "advance", &outcome, &outcome.drop);
    }
    report(cli, table_name, "advance drop", &outcome.plan.to_drop, &outcome.drop)?;
    report(cli, table_name, "advance reorg", &outcome.plan.to_add, &outcome.reorg)
}
