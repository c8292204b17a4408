//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了日志初始化。

use std::sync::Once;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// 默认日志级别
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 安装全局 fmt subscriber，只在第一次调用时生效
///
/// 过滤规则依次取 `filter`、`RUST_LOG`、`info`。
pub fn init_logging(filter: Option<&str>) {
    INIT.call_once(|| {
        let env_filter = match filter {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        };
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(env_filter)
            .with_target(false)
            .try_init()
            .ok();
    });
}
