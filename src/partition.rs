//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 分区模型
//!
//! 将 information_schema.PARTITIONS 的查询结果解析为类型化的分区集合，并提供查询操作。

use crate::database::Adapter;
use crate::error::Result;
use crate::sql::{self, Boundary};
use serde::Serialize;
use tracing::debug;

/// information_schema.PARTITIONS 中本模块关心的列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionRow {
    pub partition_name: Option<String>,
    pub partition_description: Option<String>,
    pub partition_ordinal_position: Option<u32>,
    pub table_rows: Option<u64>,
    pub data_length: Option<u64>,
    pub index_length: Option<u64>,
}

/// 表的一个 RANGE 分区
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub ordinal_position: u32,
    pub name: String,
    pub boundary: Boundary,
    pub table_rows: u64,
    pub data_length: u64,
    pub index_length: u64,
}

impl Partition {
    /// 从原始行构造；名称或上界缺失、无法解析的行返回 `None`
    pub fn from_row(row: &PartitionRow) -> Option<Self> {
        let name = row.partition_name.as_deref()?;
        let boundary = Boundary::parse(row.partition_description.as_deref()?)?;
        Some(Self {
            ordinal_position: row.partition_ordinal_position.unwrap_or_default(),
            name: name.to_string(),
            boundary,
            table_rows: row.table_rows.unwrap_or_default(),
            data_length: row.data_length.unwrap_or_default(),
            index_length: row.index_length.unwrap_or_default(),
        })
    }

    pub fn is_future(&self) -> bool {
        self.boundary.is_max_value()
    }

    /// 非 future 分区的上界时间戳
    pub fn timestamp(&self) -> Option<i64> {
        self.boundary.timestamp()
    }
}

/// 一张表当前的全部分区，按 ordinal position 升序
///
/// 每次查询数据库都重新构造，从不原地修改。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionCollection {
    partitions: Vec<Partition>,
}

const LOG_COLUMNS: [&str; 6] = [
    "ordinal_position",
    "partition_name",
    "partition_timestamp",
    "table_rows",
    "data_length",
    "index_length",
];

impl PartitionCollection {
    pub fn from_rows(rows: &[PartitionRow]) -> Self {
        let mut partitions: Vec<Partition> = rows.iter().filter_map(Partition::from_row).collect();
        partitions.sort_by_key(|p| p.ordinal_position);
        Self { partitions }
    }

    /// 从数据库读取表的分区
    pub async fn fetch(adapter: &dyn Adapter, table_name: &str) -> Result<Self> {
        let schema = adapter.schema_name().await?;
        let rows = adapter
            .select_partition_info(&sql::partition_info(), &schema, table_name)
            .await?;
        debug!(
            "fetched {} partition rows for {}.{}",
            rows.len(),
            schema,
            table_name
        );
        Ok(Self::from_rows(&rows))
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter()
    }

    pub fn as_slice(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn names(&self) -> Vec<String> {
        self.partitions.iter().map(|p| p.name.clone()).collect()
    }

    pub fn future_partition(&self) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.is_future())
    }

    pub fn non_future_partitions(&self) -> Vec<&Partition> {
        self.partitions.iter().filter(|p| !p.is_future()).collect()
    }

    fn bounded(&self) -> impl Iterator<Item = (&Partition, i64)> {
        self.partitions
            .iter()
            .filter_map(|p| p.timestamp().map(|ts| (p, ts)))
    }

    /// 上界最大的非 future 分区
    pub fn latest(&self) -> Option<&Partition> {
        self.bounded().max_by_key(|(_, ts)| *ts).map(|(p, _)| p)
    }

    /// 上界最小的非 future 分区
    pub fn oldest(&self) -> Option<&Partition> {
        self.bounded().min_by_key(|(_, ts)| *ts).map(|(p, _)| p)
    }

    /// 写入时间戳为 `reference` 的行会落入的分区：上界严格大于 `reference` 中最小的那个
    pub fn current(&self, reference: i64) -> Option<&Partition> {
        self.bounded()
            .filter(|(_, ts)| *ts > reference)
            .min_by_key(|(_, ts)| *ts)
            .map(|(p, _)| p)
    }

    /// 上界严格小于 `timestamp` 的非 future 分区
    pub fn older_than(&self, timestamp: i64) -> Vec<&Partition> {
        self.bounded()
            .filter(|(_, ts)| *ts < timestamp)
            .map(|(p, _)| p)
            .collect()
    }

    /// 上界大于等于 `timestamp` 的非 future 分区
    pub fn newer_than(&self, timestamp: i64) -> Vec<&Partition> {
        self.bounded()
            .filter(|(_, ts)| *ts >= timestamp)
            .map(|(p, _)| p)
            .collect()
    }

    /// 整个集合的表格形式
    pub fn log_table(&self) -> String {
        Self::to_log_table(&self.partitions)
    }

    /// 以定宽列渲染分区信息，空输入返回 `"none"`
    pub fn to_log_table(partitions: &[Partition]) -> String {
        if partitions.is_empty() {
            return "none".to_string();
        }

        let cells: Vec<[String; 6]> = partitions
            .iter()
            .map(|p| {
                [
                    p.ordinal_position.to_string(),
                    p.name.clone(),
                    p.boundary.to_string(),
                    p.table_rows.to_string(),
                    p.data_length.to_string(),
                    p.index_length.to_string(),
                ]
            })
            .collect();

        let padding: Vec<usize> = LOG_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let widest = cells.iter().map(|row| row[i].len()).max().unwrap_or(0);
                header.len().max(widest) + 3
            })
            .collect();

        let separator = "-".repeat(padding.iter().sum());
        let header = render_row(LOG_COLUMNS.iter().copied(), &padding);
        let body = cells
            .iter()
            .map(|row| render_row(row.iter().map(String::as_str), &padding))
            .collect::<Vec<_>>()
            .join("\n");

        [separator.clone(), header, separator.clone(), body, separator].join("\n")
    }
}

fn render_row<'a>(values: impl Iterator<Item = &'a str>, padding: &[usize]) -> String {
    values
        .zip(padding.iter())
        .map(|(value, width)| format!("{:<width$}", value, width = width))
        .collect()
}
