//! oxpartition - MySQL RANGE 分区管理库
//!
//! 按时间维护 MySQL 表的 RANGE 分区窗口：初始化分区、向未来追加分区、删除过期分区，
//! 所有变更都支持 dry run，先审阅 DDL 再执行。

#![doc(html_root_url = "https://docs.rs/oxpartition/0.1.0")]

pub mod advanced;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod manager;
pub mod partition;
pub mod sql;
pub mod telemetry;
pub mod time_unit;

// Re-export commonly used items
pub use advanced::{
    AdvancedPartitionsManager, WindowOutcome, WindowPlan, WindowPolicy, WindowStep,
};
pub use config::Config;
pub use database::{Adapter, MySqlAdapter};
pub use error::{PartitionError, Result};
pub use manager::{Applied, DdlOutcome, PartitionsManager};
pub use partition::{Partition, PartitionCollection, PartitionRow};
pub use sql::{Boundary, PartitionData, FUTURE_PARTITION_NAME, FUTURE_PARTITION_VALUE};
pub use time_unit::{CalendarUnit, TimeUnit, TimeUnitConverter};

/// oxpartition 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
