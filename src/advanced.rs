//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 滑动窗口分区管理
//!
//! 一次调用同时完成两件事：删除窗口起点之前的分区，并把分区补齐到窗口终点。

use crate::error::{PartitionError, Result};
use crate::manager::{DdlOutcome, PartitionsManager};
use crate::partition::PartitionCollection;
use crate::sql::PartitionData;
use crate::time_unit::{advance_date_time, CalendarUnit};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// 活跃分区窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// 早于该时间的分区会被删除
    pub active_partition_start: DateTime<Utc>,
    /// 分区需要覆盖到该时间
    pub active_partition_end: DateTime<Utc>,
    /// 新分区的宽度（天）
    pub window_size_days: i64,
}

impl WindowPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.active_partition_start >= self.active_partition_end {
            return Err(PartitionError::invalid_argument(format!(
                "active_partition_start ({}) must be before active_partition_end ({})",
                self.active_partition_start, self.active_partition_end
            )));
        }
        if self.window_size_days <= 0 {
            return Err(PartitionError::invalid_argument(format!(
                "window_size_days should be > 0 but got {}",
                self.window_size_days
            )));
        }
        Ok(())
    }
}

/// 新分区的步长：`size` 个日历单位
///
/// 按月分区的表必须按月步进，否则新上界不再落在月初。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowStep {
    pub unit: CalendarUnit,
    pub size: i64,
}

impl WindowStep {
    pub fn new(unit: CalendarUnit, size: i64) -> Self {
        Self { unit, size }
    }

    pub fn days(size: i64) -> Self {
        Self::new(CalendarUnit::Day, size)
    }
}

/// 一次窗口推进的规划
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WindowPlan {
    pub to_drop: Vec<String>,
    pub to_add: PartitionData,
}

/// 窗口推进的结果：先删除，后重组
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowOutcome {
    pub plan: WindowPlan,
    pub drop: DdlOutcome,
    pub reorg: DdlOutcome,
}

impl WindowOutcome {
    pub fn drop_sql(&self) -> Option<&str> {
        self.drop.sql()
    }

    pub fn reorg_sql(&self) -> Option<&str> {
        self.reorg.sql()
    }

    /// 两步都已落库（或无事可做）
    pub fn is_applied(&self) -> bool {
        !self.drop.is_dry_run() && !self.reorg.is_dry_run()
    }
}

/// 在 [`PartitionsManager`] 之上提供窗口化管理
pub struct AdvancedPartitionsManager {
    manager: PartitionsManager,
}

impl AdvancedPartitionsManager {
    pub fn new(manager: PartitionsManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &PartitionsManager {
        &self.manager
    }

    pub fn into_inner(self) -> PartitionsManager {
        self.manager
    }

    /// 从 `partition_start_timestamp` 起按 `window_size_days` 天步进，覆盖到 `partition_end_timestamp`
    pub fn build_partition_data(
        &self,
        partition_start_timestamp: i64,
        partition_end_timestamp: i64,
        window_size_days: i64,
    ) -> Result<PartitionData> {
        self.build_partition_data_by(
            partition_start_timestamp,
            partition_end_timestamp,
            WindowStep::days(window_size_days),
        )
    }

    pub fn build_partition_data_by(
        &self,
        partition_start_timestamp: i64,
        partition_end_timestamp: i64,
        step: WindowStep,
    ) -> Result<PartitionData> {
        self.manager.partitions_to_append_by_ts_range(
            partition_start_timestamp,
            partition_end_timestamp,
            step.unit,
            step.size,
        )
    }

    /// 只读取一次分区元数据，计算需要删除和新增的分区
    pub async fn plan_window(&self, policy: &WindowPolicy) -> Result<WindowPlan> {
        policy.validate()?;
        let partitions = self.manager.partitions().await?;
        self.plan_from(&partitions, policy, WindowStep::days(policy.window_size_days))
    }

    fn plan_from(
        &self,
        partitions: &PartitionCollection,
        policy: &WindowPolicy,
        step: WindowStep,
    ) -> Result<WindowPlan> {
        let converter = self.manager.converter();
        let start_timestamp = converter.from_date_time(&policy.active_partition_start);
        let end_timestamp = converter.from_date_time(&policy.active_partition_end);

        let latest_timestamp = partitions
            .latest()
            .and_then(|p| p.timestamp())
            .ok_or_else(|| {
                PartitionError::precondition_failed(
                    "At least one non future partition expected, but none found".to_string(),
                )
            })?;

        let to_drop = partitions
            .older_than(start_timestamp)
            .iter()
            .map(|p| p.name.clone())
            .collect();
        let to_add = self.build_partition_data_by(latest_timestamp, end_timestamp, step)?;

        Ok(WindowPlan { to_drop, to_add })
    }

    /// 推进分区窗口
    ///
    /// 删除上界早于窗口起点的分区，再把 future 分区重组为覆盖到窗口终点的新分区。
    /// 两条语句都在执行前完成校验；删除成功而重组失败时，删除不会回滚。
    pub async fn advance_window(
        &self,
        policy: &WindowPolicy,
        dry_run: bool,
    ) -> Result<WindowOutcome> {
        policy.validate()?;
        self.advance(policy, WindowStep::days(policy.window_size_days), dry_run)
            .await
    }

    async fn advance(
        &self,
        policy: &WindowPolicy,
        step: WindowStep,
        dry_run: bool,
    ) -> Result<WindowOutcome> {
        let partitions = self.manager.partitions().await?;
        let plan = self.plan_from(&partitions, policy, step)?;

        self.manager
            .validate_partition_names_allowed_to_drop(&partitions, &plan.to_drop)?;
        let reorg_sql = self.manager.future_reorg_sql(&plan.to_add)?;

        info!(
            table = %self.manager.table_name(),
            "advancing partition window: drop {:?}, add {:?}",
            plan.to_drop,
            plan.to_add.keys().collect::<Vec<_>>()
        );

        let drop = self
            .manager
            .drop_partitions_from(&partitions, &plan.to_drop, dry_run)
            .await?;
        let reorg = self
            .manager
            .execute_and_display_partition_info(reorg_sql, dry_run)
            .await?;

        Ok(WindowOutcome { plan, drop, reorg })
    }

    /// 以参考时间为中心推进窗口：删除早于 `drop_older_than_days` 天的分区，
    /// 并按 `window_size_days` 天的宽度补齐到 `add_through_days` 天之后
    pub async fn manage_partitions(
        &self,
        window_size_days: i64,
        drop_older_than_days: i64,
        add_through_days: i64,
        dry_run: bool,
    ) -> Result<WindowOutcome> {
        self.manage_partitions_by(
            WindowStep::days(window_size_days),
            drop_older_than_days,
            add_through_days,
            dry_run,
        )
        .await
    }

    /// 同 [`manage_partitions`](Self::manage_partitions)，新分区按 `step` 的日历单位步进
    pub async fn manage_partitions_by(
        &self,
        step: WindowStep,
        drop_older_than_days: i64,
        add_through_days: i64,
        dry_run: bool,
    ) -> Result<WindowOutcome> {
        if drop_older_than_days < 0 {
            return Err(PartitionError::invalid_argument(format!(
                "drop_older_than_days should be >= 0 but got {}",
                drop_older_than_days
            )));
        }
        let now = self.manager.current_time()?;
        let policy = WindowPolicy {
            active_partition_start: advance_date_time(
                now,
                CalendarUnit::Day,
                -drop_older_than_days,
            )?,
            active_partition_end: advance_date_time(now, CalendarUnit::Day, add_through_days)?,
            window_size_days: step.size,
        };
        policy.validate()?;
        self.advance(&policy, step, dry_run).await
    }
}
