//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 分区 DDL 生成模块
//!
//! 纯函数，根据分区数据拼装 `ALTER TABLE` 语句，不做任何 IO。

use crate::error::{PartitionError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// 哨兵分区（MAXVALUE 分区）的名称
pub const FUTURE_PARTITION_NAME: &str = "future";

/// 哨兵分区边界在 SQL 中的字面量
pub const FUTURE_PARTITION_VALUE: &str = "MAXVALUE";

lazy_static! {
    static ref IDENTIFIER_RE: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("identifier pattern is valid");
}

/// 分区上界
///
/// `Bounded` 保存存储单位下的时间戳（不含），`MaxValue` 表示无上界的 future 分区。
/// 变体顺序决定了排序：任何 `Bounded` 都小于 `MaxValue`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Boundary {
    Bounded(i64),
    MaxValue,
}

impl Boundary {
    pub fn is_max_value(&self) -> bool {
        matches!(self, Boundary::MaxValue)
    }

    /// 有界时返回时间戳
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            Boundary::Bounded(ts) => Some(*ts),
            Boundary::MaxValue => None,
        }
    }

    /// 解析 information_schema 中的 PARTITION_DESCRIPTION
    pub fn parse(description: &str) -> Option<Self> {
        let trimmed = description.trim();
        if trimmed == FUTURE_PARTITION_VALUE {
            return Some(Boundary::MaxValue);
        }
        trimmed.parse::<i64>().ok().map(Boundary::Bounded)
    }
}

impl From<i64> for Boundary {
    fn from(ts: i64) -> Self {
        Boundary::Bounded(ts)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Bounded(ts) => write!(f, "{}", ts),
            Boundary::MaxValue => write!(f, "{}", FUTURE_PARTITION_VALUE),
        }
    }
}

impl Serialize for Boundary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Boundary::Bounded(ts) => serializer.serialize_i64(*ts),
            Boundary::MaxValue => serializer.serialize_str(FUTURE_PARTITION_VALUE),
        }
    }
}

/// 规划阶段使用的分区数据：分区名 -> 上界
pub type PartitionData = BTreeMap<String, Boundary>;

/// 校验 SQL 标识符（表名、分区名），防止拼接出非法语句
pub fn validate_identifier(kind: &str, identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(PartitionError::invalid_argument(format!(
            "{} cannot be empty",
            kind
        )));
    }
    if !IDENTIFIER_RE.is_match(identifier) {
        return Err(PartitionError::invalid_argument(format!(
            "Invalid {} '{}': only alphanumeric characters and underscores are allowed, \
             it must start with a letter or underscore and be at most 64 characters",
            kind, identifier
        )));
    }
    Ok(())
}

/// 把多行 SQL 压缩成单行，便于日志阅读
pub fn compress_lines(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 按上界升序排列分区数据，MAXVALUE 永远排在最后
pub fn sort_partition_data(partition_data: &PartitionData) -> Vec<(String, Boundary)> {
    let mut sorted: Vec<(String, Boundary)> = partition_data
        .iter()
        .map(|(name, boundary)| (name.clone(), *boundary))
        .collect();
    sorted.sort_by_key(|(_, boundary)| *boundary);
    sorted
}

fn partition_list(partition_data: &PartitionData) -> String {
    sort_partition_data(partition_data)
        .iter()
        .map(|(name, boundary)| format!("PARTITION {} VALUES LESS THAN ({})", name, boundary))
        .collect::<Vec<_>>()
        .join(",")
}

/// 查询表分区元数据
pub fn partition_info() -> String {
    compress_lines(
        "SELECT *
         FROM information_schema.PARTITIONS
         WHERE TABLE_SCHEMA = ?
         AND TABLE_NAME = ?",
    )
}

/// 删除分区，名称列表为空时返回 `None`
pub fn drop_partitions(table_name: &str, partition_names: &[String]) -> Option<String> {
    if partition_names.is_empty() {
        return None;
    }
    Some(compress_lines(&format!(
        "ALTER TABLE {}
         DROP PARTITION {}",
        table_name,
        partition_names.join(",")
    )))
}

/// 追加单个分区
pub fn create_partition(table_name: &str, partition_name: &str, boundary: Boundary) -> String {
    compress_lines(&format!(
        "ALTER TABLE {}
         ADD PARTITION
         (PARTITION {}
          VALUES LESS THAN ({}))",
        table_name, partition_name, boundary
    ))
}

/// 把 `reorg_partition_name` 重组为给定的分区列表，数据为空时返回 `None`
pub fn reorg_partitions(
    table_name: &str,
    new_partition_data: &PartitionData,
    reorg_partition_name: &str,
) -> Option<String> {
    if new_partition_data.is_empty() {
        return None;
    }
    Some(compress_lines(&format!(
        "ALTER TABLE {}
         REORGANIZE PARTITION {} INTO
         ({})",
        table_name,
        reorg_partition_name,
        partition_list(new_partition_data)
    )))
}

/// 对未分区的表初始化 RANGE 分区
pub fn initialize_partitioning(table_name: &str, partition_data: &PartitionData) -> String {
    compress_lines(&format!(
        "ALTER TABLE {}
         PARTITION BY RANGE(timestamp)
         ({})",
        table_name,
        partition_list(partition_data)
    ))
}
