use crate::cli::Cli;
use crate::manager::PartitionsManager;
use anyhow::Result;

pub async fn execute(cli: &Cli, manager: &PartitionsManager) -> Result<()> {
    let partitions = manager.partitions().await?;

    if cli.json {
        let value = serde_json::json!({
            "table": manager.table_name(),
            "partitions": partitions.as_slice(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("=== {} ===", manager.table_name());
    if partitions.is_empty() {
        println!("Table is not partitioned.");
        return Ok(());
    }
    println!("{}", partitions.log_table());

    match partitions.current(manager.current_timestamp()) {
        Some(current) => println!("Current: {}", current.name),
        None => println!("⚠️ No partition covers the current time, rows land in future"),
    }
    println!();

    Ok(())
}
