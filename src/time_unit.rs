//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 时间单位换算模块
//!
//! 表中存储的时间戳单位（秒或微秒）与日历时间之间的双向换算，
//! 以及按日、按月的日历运算（月末截断、闰年）。

use crate::error::{PartitionError, Result};
use chrono::{DateTime, Days, Months, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 一天包含的秒数
pub const DAY_AS_SECONDS: i64 = 24 * 60 * 60;

/// 存储时间戳的单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// 秒
    #[default]
    Seconds,
    /// 微秒
    #[serde(alias = "microseconds")]
    MicroSeconds,
}

impl TimeUnit {
    /// 每秒包含多少个该单位
    pub fn units_per_second(self) -> i64 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::MicroSeconds => 1_000_000,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "seconds" => Ok(TimeUnit::Seconds),
            "micro_seconds" | "microseconds" => Ok(TimeUnit::MicroSeconds),
            other => Err(PartitionError::invalid_argument(format!(
                "Invalid time unit '{}' passed, expected one of: seconds, micro_seconds",
                other
            ))),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Seconds => write!(f, "seconds"),
            TimeUnit::MicroSeconds => write!(f, "micro_seconds"),
        }
    }
}

/// 日历运算单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarUnit {
    #[serde(alias = "days")]
    Day,
    #[serde(alias = "months")]
    Month,
}

impl FromStr for CalendarUnit {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day" | "days" => Ok(CalendarUnit::Day),
            "month" | "months" => Ok(CalendarUnit::Month),
            other => Err(PartitionError::invalid_argument(format!(
                "partition_size_unit must be one of: day, month (got '{}')",
                other
            ))),
        }
    }
}

impl fmt::Display for CalendarUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarUnit::Day => write!(f, "day"),
            CalendarUnit::Month => write!(f, "month"),
        }
    }
}

/// 时间单位换算器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnitConverter {
    time_unit: TimeUnit,
}

impl TimeUnitConverter {
    pub fn new(time_unit: TimeUnit) -> Self {
        Self { time_unit }
    }

    /// 按名称创建换算器，名称不受支持时返回 `InvalidArgument`
    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    /// 秒 -> 存储单位
    pub fn to_storage_unit(&self, seconds: i64) -> i64 {
        seconds.saturating_mul(self.time_unit.units_per_second())
    }

    /// 存储单位 -> 秒（整数除法，向零截断）
    pub fn to_seconds(&self, timestamp: i64) -> i64 {
        timestamp / self.time_unit.units_per_second()
    }

    /// 天数 -> 存储单位下的时长
    pub fn from_days(&self, num_days: i64) -> i64 {
        self.to_storage_unit(num_days.saturating_mul(DAY_AS_SECONDS))
    }

    /// 存储时间戳 -> UTC 日历时间
    pub fn to_date_time(&self, timestamp: i64) -> Result<DateTime<Utc>> {
        let seconds = self.to_seconds(timestamp);
        Utc.timestamp_opt(seconds, 0).single().ok_or_else(|| {
            PartitionError::invalid_argument(format!(
                "timestamp {} is outside the representable calendar range",
                timestamp
            ))
        })
    }

    /// UTC 日历时间 -> 存储时间戳
    pub fn from_date_time(&self, date_time: &DateTime<Utc>) -> i64 {
        self.to_storage_unit(date_time.timestamp())
    }

    /// 在存储时间戳上前进 `amount` 个日历单位，负数表示后退
    pub fn advance(&self, timestamp: i64, unit: CalendarUnit, amount: i64) -> Result<i64> {
        let date_time = self.to_date_time(timestamp)?;
        let advanced = advance_date_time(date_time, unit, amount)?;
        Ok(self.from_date_time(&advanced))
    }
}

/// 日历运算：按日跨月跨年，按月时若目标月份不存在原日期则截断到该月最后一天
pub fn advance_date_time(
    date_time: DateTime<Utc>,
    unit: CalendarUnit,
    amount: i64,
) -> Result<DateTime<Utc>> {
    let magnitude = amount.unsigned_abs();
    let advanced = match unit {
        CalendarUnit::Day => {
            let days = Days::new(magnitude);
            if amount >= 0 {
                date_time.checked_add_days(days)
            } else {
                date_time.checked_sub_days(days)
            }
        }
        CalendarUnit::Month => {
            let months = u32::try_from(magnitude).map(Months::new).map_err(|_| {
                PartitionError::invalid_argument(format!("month offset {} is too large", amount))
            })?;
            if amount >= 0 {
                date_time.checked_add_months(months)
            } else {
                date_time.checked_sub_months(months)
            }
        }
    };

    advanced.ok_or_else(|| {
        PartitionError::invalid_argument(format!(
            "advancing {} by {} {} leaves the calendar range",
            date_time, amount, unit
        ))
    })
}
