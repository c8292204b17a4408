//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 数据库适配层
//!
//! 分区管理只通过 [`Adapter`] 访问数据库：两种固定形状的查询（分区元数据行、单值会话变量）
//! 加上语句执行。连接由调用方创建和持有，管理器从不打开或关闭连接。

use crate::error::{PartitionError, Result};
use crate::partition::PartitionRow;
use async_trait::async_trait;
use std::future::Future;
use tracing::{debug, warn};

pub mod connection_string;
pub mod mysql;

pub use connection_string::{redact_password, validate_mysql_url, ParsedMySqlUrl};
pub use mysql::{MySqlAdapter, MySqlConnectOptions};

/// 读取当前会话 lock_wait_timeout 的语句
pub const SELECT_LOCK_WAIT_TIMEOUT: &str = "SELECT @@local.lock_wait_timeout";

/// 数据库适配器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Adapter: Send + Sync {
    /// 执行分区元数据查询，参数依次绑定 schema 和表名
    async fn select_partition_info(
        &self,
        query: &str,
        schema_name: &str,
        table_name: &str,
    ) -> Result<Vec<PartitionRow>>;

    /// 执行返回单个值的查询
    async fn select_scalar(&self, query: &str) -> Result<Option<String>>;

    /// 执行语句，返回受影响的行数
    async fn execute(&self, statement: &str) -> Result<u64>;

    /// 当前连接所在的 schema
    async fn schema_name(&self) -> Result<String>;
}

/// 在临时修改的 lock_wait_timeout 下执行 `f`
///
/// 无论 `f` 成功与否都会恢复原值；`f` 失败时返回 `f` 的错误。
pub async fn with_lock_wait_timeout<F, Fut, T>(
    adapter: &dyn Adapter,
    timeout_secs: u64,
    f: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let before = adapter
        .select_scalar(SELECT_LOCK_WAIT_TIMEOUT)
        .await?
        .ok_or_else(|| {
            PartitionError::DatabaseStatementFailed(
                "@@local.lock_wait_timeout returned no value".to_string(),
            )
        })?;
    let before: u64 = before.trim().parse().map_err(|_| {
        PartitionError::DatabaseStatementFailed(format!(
            "unexpected @@local.lock_wait_timeout value '{}'",
            before
        ))
    })?;

    debug!(
        "setting lock_wait_timeout to {}s (was {}s)",
        timeout_secs, before
    );
    adapter
        .execute(&format!("SET @@local.lock_wait_timeout = {}", timeout_secs))
        .await?;

    let result = f().await;

    let restored = adapter
        .execute(&format!("SET @@local.lock_wait_timeout = {}", before))
        .await;

    match (result, restored) {
        (Ok(value), Ok(_)) => Ok(value),
        (Ok(_), Err(restore_err)) => Err(restore_err),
        (Err(err), Ok(_)) => Err(err),
        (Err(err), Err(restore_err)) => {
            warn!(
                "failed to restore lock_wait_timeout to {}s: {}",
                before, restore_err
            );
            Err(err)
        }
    }
}
