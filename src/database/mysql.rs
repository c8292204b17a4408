//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于 sea-orm 的 MySQL 适配器实现。

use super::{connection_string::validate_mysql_url, redact_password, Adapter};
use crate::error::{PartitionError, Result};
use crate::partition::PartitionRow;
use async_trait::async_trait;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult,
    Statement, TryGetable, Value,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// 连接池参数
#[derive(Debug, Clone)]
pub struct MySqlConnectOptions {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
    /// 整个建连过程的超时
    pub overall_timeout: Duration,
}

impl Default for MySqlConnectOptions {
    fn default() -> Self {
        Self {
            max_connections: 2,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(8),
            acquire_timeout: Duration::from_secs(10),
            overall_timeout: Duration::from_secs(30),
        }
    }
}

/// MySQL 适配器
///
/// 分区 DDL 依赖会话变量（lock_wait_timeout），所以连接池保持很小。
pub struct MySqlAdapter {
    connection: Arc<DatabaseConnection>,
    schema_name: String,
}

impl MySqlAdapter {
    /// 建立连接并读取当前 schema
    pub async fn connect(connection_string: &str, options: MySqlConnectOptions) -> Result<Self> {
        validate_mysql_url(connection_string)?;

        let mut opt = ConnectOptions::new(connection_string.to_string());
        opt.max_connections(options.max_connections)
            .min_connections(options.min_connections)
            .connect_timeout(options.connect_timeout)
            .idle_timeout(options.idle_timeout)
            .acquire_timeout(options.acquire_timeout)
            .sqlx_logging(false);

        let start = Instant::now();
        let connection = match timeout(options.overall_timeout, Database::connect(opt)).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return Err(PartitionError::DatabaseStatementFailed(format!(
                    "Failed to connect to MySQL at {}: {}",
                    redact_password(connection_string),
                    e
                )));
            }
            Err(_) => {
                return Err(PartitionError::DatabaseStatementFailed(format!(
                    "Connection timeout: MySQL server not responding within {:?}",
                    options.overall_timeout
                )));
            }
        };

        let acquire_duration = start.elapsed();
        info!("MySQL connection established in {:?}", acquire_duration);
        if acquire_duration > Duration::from_secs(3) {
            warn!(
                "MySQL connection took longer than expected: {:?}",
                acquire_duration
            );
        }

        Self::from_connection(Arc::new(connection)).await
    }

    /// 复用调用方已有的连接
    pub async fn from_connection(connection: Arc<DatabaseConnection>) -> Result<Self> {
        let row = connection
            .query_one(Statement::from_string(
                DatabaseBackend::MySql,
                "SELECT DATABASE()".to_string(),
            ))
            .await?;
        let schema_name = row
            .map(|r| r.try_get_by_index::<Option<String>>(0))
            .transpose()?
            .flatten()
            .ok_or_else(|| {
                PartitionError::ConfigError(
                    "No database selected: the connection string must name a schema".to_string(),
                )
            })?;

        Ok(Self {
            connection,
            schema_name,
        })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// 测试连接是否活跃
    pub async fn ping(&self) -> Result<()> {
        self.connection
            .execute(Statement::from_string(
                DatabaseBackend::MySql,
                "SELECT 1".to_string(),
            ))
            .await
            .map_err(|e| {
                PartitionError::DatabaseStatementFailed(format!(
                    "Connection health check failed: {}. The connection may have been lost.",
                    e
                ))
            })?;
        Ok(())
    }

    /// 验证连接健康状态
    pub async fn health_check(&self) -> bool {
        if let Err(e) = self.ping().await {
            warn!("MySQL health check failed: {}", e);
            return false;
        }
        true
    }
}

/// information_schema 的数值列在不同 MySQL 版本中有无符号和有符号两种类型
fn get_u64(row: &QueryResult, column: &str) -> Result<Option<u64>> {
    if let Ok(value) = row.try_get::<Option<u64>>("", column) {
        return Ok(value);
    }
    let value: Option<i64> = row.try_get("", column)?;
    Ok(value.and_then(|v| u64::try_from(v).ok()))
}

fn get_scalar<T: TryGetable + ToString>(row: &QueryResult) -> Option<String> {
    row.try_get_by_index::<Option<T>>(0)
        .ok()
        .flatten()
        .map(|v| v.to_string())
}

fn partition_row(row: &QueryResult) -> Result<PartitionRow> {
    Ok(PartitionRow {
        partition_name: row.try_get("", "PARTITION_NAME")?,
        partition_description: row.try_get("", "PARTITION_DESCRIPTION")?,
        partition_ordinal_position: get_u64(row, "PARTITION_ORDINAL_POSITION")?
            .and_then(|v| u32::try_from(v).ok()),
        table_rows: get_u64(row, "TABLE_ROWS")?,
        data_length: get_u64(row, "DATA_LENGTH")?,
        index_length: get_u64(row, "INDEX_LENGTH")?,
    })
}

#[async_trait]
impl Adapter for MySqlAdapter {
    async fn select_partition_info(
        &self,
        query: &str,
        schema_name: &str,
        table_name: &str,
    ) -> Result<Vec<PartitionRow>> {
        let values: [Value; 2] = [schema_name.into(), table_name.into()];
        let statement = Statement::from_sql_and_values(DatabaseBackend::MySql, query, values);
        let rows = self.connection.query_all(statement).await?;
        debug!(
            "select_partition_info found {} rows for {}.{}",
            rows.len(),
            schema_name,
            table_name
        );
        rows.iter().map(partition_row).collect()
    }

    async fn select_scalar(&self, query: &str) -> Result<Option<String>> {
        let row = self
            .connection
            .query_one(Statement::from_string(
                DatabaseBackend::MySql,
                query.to_string(),
            ))
            .await?;
        Ok(row.and_then(|r| {
            get_scalar::<u64>(&r)
                .or_else(|| get_scalar::<i64>(&r))
                .or_else(|| get_scalar::<String>(&r))
        }))
    }

    async fn execute(&self, statement: &str) -> Result<u64> {
        let result = self
            .connection
            .execute(Statement::from_string(
                DatabaseBackend::MySql,
                statement.to_string(),
            ))
            .await?;
        Ok(result.rows_affected())
    }

    async fn schema_name(&self) -> Result<String> {
        Ok(self.schema_name.clone())
    }
}
