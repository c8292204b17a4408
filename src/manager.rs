//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 分区管理器
//!
//! 针对单张表规划分区窗口（新增、重组、删除），生成 DDL，并通过注入的适配器执行。
//! 所有变更操作都支持 dry run：只返回将要执行的 SQL，不触达数据库。

use crate::database::{with_lock_wait_timeout, Adapter};
use crate::error::{PartitionError, Result};
use crate::partition::PartitionCollection;
use crate::sql::{self, Boundary, PartitionData, FUTURE_PARTITION_NAME, FUTURE_PARTITION_VALUE};
use crate::time_unit::{CalendarUnit, TimeUnit, TimeUnitConverter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// 一次 DDL 操作的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "sql", rename_all = "snake_case")]
pub enum DdlOutcome {
    /// 没有需要执行的语句
    Skipped,
    /// dry run，返回将要执行的语句
    DryRun(String),
    /// 语句已执行
    Executed(String),
}

impl DdlOutcome {
    pub fn sql(&self) -> Option<&str> {
        match self {
            DdlOutcome::Skipped => None,
            DdlOutcome::DryRun(sql) | DdlOutcome::Executed(sql) => Some(sql),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, DdlOutcome::Skipped)
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, DdlOutcome::DryRun(_))
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, DdlOutcome::Executed(_))
    }
}

/// 规划结果与对应 DDL 的执行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Applied<T> {
    pub plan: T,
    pub outcome: DdlOutcome,
}

/// 单表分区管理器
pub struct PartitionsManager {
    adapter: Arc<dyn Adapter>,
    table_name: String,
    converter: TimeUnitConverter,
    current_timestamp: i64,
    lock_wait_timeout: Option<u64>,
}

impl PartitionsManager {
    /// 创建管理器，参考时间默认为当前时间
    pub fn new(
        adapter: Arc<dyn Adapter>,
        table_name: impl Into<String>,
        time_unit: TimeUnit,
    ) -> Result<Self> {
        let table_name = table_name.into();
        sql::validate_identifier("table name", &table_name)?;
        let converter = TimeUnitConverter::new(time_unit);
        Ok(Self {
            adapter,
            table_name,
            converter,
            current_timestamp: converter.from_date_time(&Utc::now()),
            lock_wait_timeout: None,
        })
    }

    /// 使用指定时间作为参考时间
    pub fn with_current_time(mut self, current_time: DateTime<Utc>) -> Self {
        self.current_timestamp = self.converter.from_date_time(&current_time);
        self
    }

    /// 使用存储单位下的时间戳作为参考时间
    pub fn with_current_timestamp(mut self, current_timestamp: i64) -> Self {
        self.current_timestamp = current_timestamp;
        self
    }

    /// 执行 DDL 时临时设置 lock_wait_timeout（秒）
    pub fn with_lock_wait_timeout(mut self, timeout_secs: u64) -> Self {
        self.lock_wait_timeout = Some(timeout_secs);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.converter.time_unit()
    }

    pub fn converter(&self) -> &TimeUnitConverter {
        &self.converter
    }

    pub fn current_timestamp(&self) -> i64 {
        self.current_timestamp
    }

    pub fn current_time(&self) -> Result<DateTime<Utc>> {
        self.converter.to_date_time(self.current_timestamp)
    }

    pub fn lock_wait_timeout(&self) -> Option<u64> {
        self.lock_wait_timeout
    }

    /// 由上界生成分区名：`until_YYYY_MM_DD`（UTC），MAXVALUE 对应 `future`
    pub fn name_from_timestamp(&self, boundary: Boundary) -> Result<String> {
        match boundary {
            Boundary::MaxValue => Ok(FUTURE_PARTITION_NAME.to_string()),
            Boundary::Bounded(ts) => {
                let date_time = self.converter.to_date_time(ts)?;
                Ok(format!("until_{}", date_time.format("%Y_%m_%d")))
            }
        }
    }

    /// 读取表当前的分区
    pub async fn partitions(&self) -> Result<PartitionCollection> {
        PartitionCollection::fetch(self.adapter.as_ref(), &self.table_name).await
    }

    /// 把当前分区以表格形式写入日志
    pub async fn display_partition_info(&self) -> Result<()> {
        let partitions = self.partitions().await?;
        info!(table = %self.table_name, "\n{}", partitions.log_table());
        Ok(())
    }

    /// 对未分区的表初始化分区，自动补上 future 分区
    pub async fn initialize_partitioning(
        &self,
        partition_data: &PartitionData,
        dry_run: bool,
    ) -> Result<DdlOutcome> {
        let mut partition_data = partition_data.clone();
        partition_data.insert(FUTURE_PARTITION_NAME.to_string(), Boundary::MaxValue);

        self.validate_partition_data(&partition_data)?;

        let init_sql = sql::initialize_partitioning(&self.table_name, &partition_data);
        self.execute_and_display_partition_info(Some(init_sql), dry_run)
            .await
    }

    /// 以参考时间为起点，按 `size` 个日历单位为间隔初始化分区，覆盖到 `days_into_future` 天之后
    pub async fn initialize_partitioning_in_intervals(
        &self,
        unit: CalendarUnit,
        size: i64,
        days_into_future: i64,
        dry_run: bool,
    ) -> Result<Applied<PartitionData>> {
        let plan = self.partitions_to_append(self.current_timestamp, unit, size, days_into_future)?;
        let outcome = self.initialize_partitioning(&plan, dry_run).await?;
        Ok(Applied { plan, outcome })
    }

    /// 以参考时间为基准，按相对偏移（可为负）初始化分区
    ///
    /// 例如按月 `[-2, -1, 0, 1]` 会生成 4 个分区外加 future 分区。
    pub async fn initialize_partitioning_relative(
        &self,
        unit: CalendarUnit,
        offsets: &[i64],
        dry_run: bool,
    ) -> Result<Applied<PartitionData>> {
        let mut offsets = offsets.to_vec();
        offsets.sort_unstable();

        let mut plan = PartitionData::new();
        for offset in offsets {
            let until_timestamp = self.converter.advance(self.current_timestamp, unit, offset)?;
            let boundary = Boundary::Bounded(until_timestamp);
            plan.insert(self.name_from_timestamp(boundary)?, boundary);
        }

        let outcome = self.initialize_partitioning(&plan, dry_run).await?;
        Ok(Applied { plan, outcome })
    }

    /// 按名称删除分区，future 分区和当前分区不允许删除
    pub async fn drop_partitions(
        &self,
        partition_names: &[String],
        dry_run: bool,
    ) -> Result<DdlOutcome> {
        let partitions = self.partitions().await?;
        self.drop_partitions_from(&partitions, partition_names, dry_run)
            .await
    }

    /// 把 future 分区重组为给定分区加上新的 future 分区
    pub async fn reorg_future_partition(
        &self,
        partition_data: &PartitionData,
        dry_run: bool,
    ) -> Result<DdlOutcome> {
        let reorg_sql = self.future_reorg_sql(partition_data)?;
        self.execute_and_display_partition_info(reorg_sql, dry_run)
            .await
    }

    /// 直接 ADD PARTITION，分区名由时间戳生成
    pub async fn create_partition(&self, until_timestamp: i64, dry_run: bool) -> Result<DdlOutcome> {
        validate_timestamp("until_timestamp", until_timestamp)?;
        let boundary = Boundary::Bounded(until_timestamp);
        let partition_name = self.name_from_timestamp(boundary)?;
        let create_sql = sql::create_partition(&self.table_name, &partition_name, boundary);
        self.execute_and_display_partition_info(Some(create_sql), dry_run)
            .await
    }

    /// 从 `start_timestamp` 起按 `size` 个日历单位步进，直到达到或越过 `end_timestamp`
    ///
    /// 每一步产生一个分区上界；`start_timestamp >= end_timestamp` 时返回空。
    /// 最后一个上界 `>= end_timestamp`，倒数第二个 `< end_timestamp`。
    pub fn partitions_to_append_by_ts_range(
        &self,
        start_timestamp: i64,
        end_timestamp: i64,
        unit: CalendarUnit,
        size: i64,
    ) -> Result<PartitionData> {
        validate_timestamp("start_timestamp", start_timestamp)?;
        validate_timestamp("end_timestamp", end_timestamp)?;
        validate_positive("partition_size", size)?;

        let mut partition_data = PartitionData::new();
        let mut until_timestamp = start_timestamp;
        while until_timestamp < end_timestamp {
            until_timestamp = self.converter.advance(until_timestamp, unit, size)?;
            let boundary = Boundary::Bounded(until_timestamp);
            partition_data.insert(self.name_from_timestamp(boundary)?, boundary);
        }
        Ok(partition_data)
    }

    /// 覆盖到参考时间之后 `days_into_future` 天所需的分区
    pub fn partitions_to_append(
        &self,
        partition_start_timestamp: i64,
        unit: CalendarUnit,
        size: i64,
        days_into_future: i64,
    ) -> Result<PartitionData> {
        validate_positive("days_into_future", days_into_future)?;
        let end_timestamp = self
            .current_timestamp
            .saturating_add(self.converter.from_days(days_into_future));
        self.partitions_to_append_by_ts_range(partition_start_timestamp, end_timestamp, unit, size)
    }

    /// 从最新的分区往后追加，直到覆盖参考时间之后 `days_into_future` 天
    pub async fn append_partition_intervals(
        &self,
        unit: CalendarUnit,
        size: i64,
        days_into_future: i64,
        dry_run: bool,
    ) -> Result<Applied<PartitionData>> {
        validate_positive("partition_size", size)?;
        validate_positive("days_into_future", days_into_future)?;

        let partitions = self.partitions().await?;
        if partitions.is_empty() {
            return Err(PartitionError::precondition_failed(format!(
                "table {} has no partitions, partitioning must be initialized first",
                self.table_name
            )));
        }
        let latest = partitions.latest().ok_or_else(|| {
            PartitionError::precondition_failed(format!(
                "table {} only has the {} partition, partitioning must be initialized first",
                self.table_name, FUTURE_PARTITION_NAME
            ))
        })?;
        let latest_timestamp = latest.timestamp().ok_or_else(|| {
            PartitionError::precondition_failed("latest partition has no boundary".to_string())
        })?;

        let plan = self.partitions_to_append(latest_timestamp, unit, size, days_into_future)?;
        if plan.is_empty() {
            info!(
                table = %self.table_name,
                "latest partition {} already covers {} days into the future at {} {} each",
                latest.name, days_into_future, size, unit
            );
            return Ok(Applied {
                plan,
                outcome: DdlOutcome::Skipped,
            });
        }

        info!(
            table = %self.table_name,
            "appending {} partitions after {}: {:?}",
            plan.len(),
            latest.name,
            plan.keys().collect::<Vec<_>>()
        );
        let outcome = self.reorg_future_partition(&plan, dry_run).await?;
        Ok(Applied { plan, outcome })
    }

    /// 删除上界严格小于 `timestamp` 的分区
    pub async fn drop_partitions_older_than(
        &self,
        timestamp: i64,
        dry_run: bool,
    ) -> Result<Applied<Vec<String>>> {
        validate_timestamp("timestamp", timestamp)?;

        let partitions = self.partitions().await?;
        let names: Vec<String> = partitions
            .older_than(timestamp)
            .iter()
            .map(|p| p.name.clone())
            .collect();

        if names.is_empty() {
            info!(
                table = %self.table_name,
                "Drop: no partitions older than {} ({})",
                timestamp,
                self.describe_timestamp(timestamp)
            );
            return Ok(Applied {
                plan: names,
                outcome: DdlOutcome::Skipped,
            });
        }

        info!(table = %self.table_name, "Dropping partitions: {:?}", names);
        let outcome = self
            .drop_partitions_from(&partitions, &names, dry_run)
            .await?;
        Ok(Applied {
            plan: names,
            outcome,
        })
    }

    /// 删除早于参考时间 `days` 天的分区
    pub async fn drop_partitions_older_than_in_days(
        &self,
        days: i64,
        dry_run: bool,
    ) -> Result<Applied<Vec<String>>> {
        if days < 0 {
            return Err(PartitionError::invalid_argument(format!(
                "days should be >= 0 but got {}",
                days
            )));
        }
        let timestamp = self
            .current_timestamp
            .saturating_sub(self.converter.from_days(days));
        self.drop_partitions_older_than(timestamp, dry_run).await
    }

    /// 上界严格小于 `timestamp` 的分区名
    pub async fn partitions_older_than(&self, timestamp: i64) -> Result<Vec<String>> {
        let partitions = self.partitions().await?;
        Ok(partitions
            .older_than(timestamp)
            .iter()
            .map(|p| p.name.clone())
            .collect())
    }

    /// 上界大于等于 `timestamp` 的分区名，不含当前分区
    pub async fn partitions_newer_than(&self, timestamp: i64) -> Result<Vec<String>> {
        let partitions = self.partitions().await?;
        let current = partitions
            .current(self.current_timestamp)
            .map(|p| p.name.clone());
        Ok(partitions
            .newer_than(timestamp)
            .iter()
            .filter(|p| Some(&p.name) != current.as_ref())
            .map(|p| p.name.clone())
            .collect())
    }

    // ---------------------------------------------------------------------
    // 供 AdvancedPartitionsManager 复用的内部步骤
    // ---------------------------------------------------------------------

    /// 在已读取的分区集合上校验并删除
    pub(crate) async fn drop_partitions_from(
        &self,
        partitions: &PartitionCollection,
        partition_names: &[String],
        dry_run: bool,
    ) -> Result<DdlOutcome> {
        self.validate_partition_names_allowed_to_drop(partitions, partition_names)?;
        let drop_sql = sql::drop_partitions(&self.table_name, partition_names);
        self.execute_and_display_partition_info(drop_sql, dry_run)
            .await
    }

    /// 生成重组 future 分区的语句；数据为空时返回 `None`
    pub(crate) fn future_reorg_sql(&self, partition_data: &PartitionData) -> Result<Option<String>> {
        let mut partition_data = partition_data.clone();
        if !partition_data.is_empty() {
            partition_data.insert(FUTURE_PARTITION_NAME.to_string(), Boundary::MaxValue);
        }
        self.validate_partition_data(&partition_data)?;
        Ok(sql::reorg_partitions(
            &self.table_name,
            &partition_data,
            FUTURE_PARTITION_NAME,
        ))
    }

    pub(crate) fn validate_partition_names_allowed_to_drop(
        &self,
        partitions: &PartitionCollection,
        partition_names: &[String],
    ) -> Result<()> {
        for name in partition_names {
            self.validate_partition_name(name)?;
        }

        let mut black_listed = vec![FUTURE_PARTITION_NAME.to_string()];
        if let Some(active) = partitions.current(self.current_timestamp) {
            black_listed.push(active.name.clone());
        }

        if let Some(name) = partition_names.iter().find(|n| black_listed.contains(n)) {
            return Err(PartitionError::invalid_argument(format!(
                "current and future partition can never be dropped (got '{}')",
                name
            )));
        }
        Ok(())
    }

    /// 执行 SQL 并记录执行后的分区；`None` 表示无事可做
    pub(crate) async fn execute_and_display_partition_info(
        &self,
        sql: Option<String>,
        dry_run: bool,
    ) -> Result<DdlOutcome> {
        let Some(sql) = sql else {
            debug!(table = %self.table_name, "no DDL to execute");
            return Ok(DdlOutcome::Skipped);
        };

        if dry_run {
            info!(table = %self.table_name, dry_run = true, "{}", sql);
            return Ok(DdlOutcome::DryRun(sql));
        }

        info!(table = %self.table_name, "{}", sql);
        self.execute(&sql).await?;
        self.display_partition_info().await?;
        Ok(DdlOutcome::Executed(sql))
    }

    async fn execute(&self, sql: &str) -> Result<u64> {
        let adapter = self.adapter.as_ref();
        match self.lock_wait_timeout {
            Some(timeout_secs) => {
                with_lock_wait_timeout(adapter, timeout_secs, || adapter.execute(sql)).await
            }
            None => adapter.execute(sql).await,
        }
    }

    fn describe_timestamp(&self, timestamp: i64) -> String {
        self.converter
            .to_date_time(timestamp)
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|_| "out of range".to_string())
    }

    // ---------------------------------------------------------------------
    // 校验
    // ---------------------------------------------------------------------

    fn validate_partition_name(&self, partition_name: &str) -> Result<()> {
        sql::validate_identifier("partition name", partition_name)
    }

    /// future 分区名必须对应 MAXVALUE，反之亦然
    pub(crate) fn validate_partition_data(&self, partition_data: &PartitionData) -> Result<()> {
        for (name, boundary) in partition_data {
            self.validate_partition_name(name)?;
            if let Boundary::Bounded(ts) = boundary {
                validate_timestamp("timestamp", *ts)?;
            }

            let is_future_name = name == FUTURE_PARTITION_NAME;
            if is_future_name != boundary.is_max_value() {
                return Err(PartitionError::invalid_argument(format!(
                    "future partition name '{}' must use timestamp '{}', \
                     but got name {} and timestamp {}",
                    FUTURE_PARTITION_NAME, FUTURE_PARTITION_VALUE, name, boundary
                )));
            }
        }
        Ok(())
    }
}

fn validate_timestamp(name: &str, timestamp: i64) -> Result<()> {
    if timestamp < 0 {
        return Err(PartitionError::invalid_argument(format!(
            "{} should be >= 0 but got {}",
            name, timestamp
        )));
    }
    Ok(())
}

fn validate_positive(name: &str, value: i64) -> Result<()> {
    if value <= 0 {
        return Err(PartitionError::invalid_argument(format!(
            "{} should be > 0 but got {}",
            name, value
        )));
    }
    Ok(())
}
