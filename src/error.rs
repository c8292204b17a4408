//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了分区管理的错误类型和处理机制。

use thiserror::Error;

/// 分区管理错误类型枚举
///
/// 校验类错误（`InvalidArgument`、`PreconditionFailed`）总是在执行任何 DDL 之前产生，
/// 数据库错误原样透传给调用方，不做重试。
#[derive(Error, Debug)]
pub enum PartitionError {
    /// 调用方传入的参数不合法
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 表当前的分区状态不支持该操作
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// 数据库拒绝或执行语句失败
    #[error("Database statement failed: {0}")]
    DatabaseStatementFailed(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sea_orm::DbErr> for PartitionError {
    fn from(err: sea_orm::DbErr) -> Self {
        PartitionError::DatabaseStatementFailed(err.to_string())
    }
}

impl PartitionError {
    /// 构造参数错误
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        PartitionError::InvalidArgument(message.into())
    }

    /// 构造前置条件错误
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        PartitionError::PreconditionFailed(message.into())
    }
}

/// 分区操作结果类型别名
pub type Result<T> = std::result::Result<T, PartitionError>;
