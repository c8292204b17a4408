//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了分区管理的配置结构和解析逻辑。

use crate::advanced::WindowStep;
use crate::database::redact_password;
use crate::error::{PartitionError, Result};
use crate::sql;
use crate::time_unit::{CalendarUnit, TimeUnit};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const CONFIG_VERSION: u32 = 1;
pub const CONFIG_VERSION_FIELD: &str = "config_version";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub config_version: Option<u32>,
    pub database: DatabaseConfig,
    /// 表名 -> 分区策略
    #[serde(default)]
    pub tables: BTreeMap<String, TableConfig>,
}

/// 数据库连接配置
#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    /// 连接字符串，包含密码，不以明文输出
    pub url: SecretString,
    /// 建连超时（秒）
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// 执行 DDL 时临时设置的 lock_wait_timeout（秒）
    #[serde(default)]
    pub lock_wait_timeout_secs: Option<u64>,
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl DatabaseConfig {
    /// 脱敏后的连接字符串，用于日志和错误信息
    pub fn redacted_url(&self) -> String {
        redact_password(self.url.expose_secret())
    }
}

/// 单表分区策略
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TableConfig {
    /// 分区列的存储单位
    #[serde(default)]
    pub time_unit: TimeUnit,
    /// 每个分区跨越的日历单位
    #[serde(default = "default_partition_unit")]
    pub partition_unit: CalendarUnit,
    /// 每个分区跨越几个日历单位
    #[serde(default = "default_partition_size")]
    pub partition_size: i64,
    /// 分区需要覆盖到未来多少天
    #[serde(default = "default_days_into_future")]
    pub days_into_future: i64,
    /// 删除早于多少天的分区，不设置则不删除
    #[serde(default)]
    pub drop_older_than_days: Option<i64>,
}

fn default_partition_unit() -> CalendarUnit {
    CalendarUnit::Month
}

fn default_partition_size() -> i64 {
    1
}

fn default_days_into_future() -> i64 {
    30
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            time_unit: TimeUnit::Seconds,
            partition_unit: default_partition_unit(),
            partition_size: default_partition_size(),
            days_into_future: default_days_into_future(),
            drop_older_than_days: None,
        }
    }
}

impl TableConfig {
    /// 窗口推进时新分区的步长，与 append 使用相同的日历单位
    pub fn window_step(&self) -> WindowStep {
        WindowStep::new(self.partition_unit, self.partition_size)
    }
}

impl Config {
    /// 从 TOML 字符串解析并校验配置
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)
            .map_err(|e| PartitionError::ConfigError(format!("Invalid configuration: {}", e)))?;
        config.validate().map_err(PartitionError::ConfigError)?;
        Ok(config)
    }

    /// 从文件读取并校验配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PartitionError::ConfigError(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// 查找表配置
    pub fn table(&self, name: &str) -> Result<&TableConfig> {
        self.tables.get(name).ok_or_else(|| {
            PartitionError::ConfigError(format!("Table '{}' is not configured", name))
        })
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = self.config_version {
            if version != CONFIG_VERSION {
                return Err(format!(
                    "Unsupported {} {}, expected {}",
                    CONFIG_VERSION_FIELD, version, CONFIG_VERSION
                ));
            }
        }

        if !self.database.url.expose_secret().starts_with("mysql://") {
            return Err(format!(
                "Database url '{}' must start with mysql://",
                self.database.redacted_url()
            ));
        }
        if self.database.connect_timeout_secs == 0 {
            return Err("Database connect_timeout_secs cannot be zero".to_string());
        }

        for (name, table) in &self.tables {
            if name.is_empty() {
                return Err("Table name cannot be empty".to_string());
            }
            sql::validate_identifier("table name", name).map_err(|e| e.to_string())?;

            if table.partition_size <= 0 {
                return Err(format!(
                    "Table '{}' partition_size must be greater than zero",
                    name
                ));
            }
            if table.days_into_future <= 0 {
                return Err(format!(
                    "Table '{}' days_into_future must be greater than zero",
                    name
                ));
            }
            if let Some(days) = table.drop_older_than_days {
                if days < 0 {
                    return Err(format!(
                        "Table '{}' drop_older_than_days cannot be negative",
                        name
                    ));
                }
            }
        }

        Ok(())
    }
}
