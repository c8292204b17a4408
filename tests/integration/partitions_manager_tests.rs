//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! PartitionsManager 端到端测试，运行在内存 MySQL 适配器之上

#[path = "../common/mod.rs"]
mod common;

use chrono::{DateTime, Utc};
use common::{setup_logging, ts, utc, FakeMySql, TEST_TABLE};
use oxpartition::database::Adapter;
use oxpartition::{
    Boundary, CalendarUnit, DdlOutcome, PartitionData, PartitionError, PartitionsManager,
    TimeUnit,
};
use std::sync::Arc;

fn manager(fake: &Arc<FakeMySql>, now: DateTime<Utc>) -> PartitionsManager {
    setup_logging();
    let adapter: Arc<dyn Adapter> = fake.clone();
    PartitionsManager::new(adapter, TEST_TABLE, TimeUnit::Seconds)
        .unwrap()
        .with_current_time(now)
}

fn data(entries: &[(&str, i64)]) -> PartitionData {
    entries
        .iter()
        .map(|(name, ts)| (name.to_string(), Boundary::Bounded(*ts)))
        .collect()
}

fn pairs(entries: &[(&str, &str)]) -> Vec<(String, String)> {
    entries
        .iter()
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .collect()
}

/// 按月初始化分区：02-18, 03-18, 04-18, 05-18
async fn monthly_fixture(now: DateTime<Utc>) -> (Arc<FakeMySql>, PartitionsManager) {
    let fake = Arc::new(FakeMySql::new());
    let manager = manager(&fake, now);
    manager
        .initialize_partitioning(
            &data(&[
                ("until_2014_02_18", ts(2014, 2, 18)),
                ("until_2014_03_18", ts(2014, 3, 18)),
                ("until_2014_04_18", ts(2014, 4, 18)),
                ("until_2014_05_18", ts(2014, 5, 18)),
            ]),
            false,
        )
        .await
        .unwrap();
    (fake, manager)
}

#[tokio::test]
async fn test_initialize_partitioning_adds_future_partition() {
    let fake = Arc::new(FakeMySql::new());
    let manager = manager(&fake, utc(2014, 3, 1));

    let outcome = manager
        .initialize_partitioning(&data(&[("until_2014_03_17", 1395014400)]), false)
        .await
        .unwrap();

    assert!(outcome.is_executed());
    assert_eq!(
        fake.partitions(TEST_TABLE),
        pairs(&[("until_2014_03_17", "1395014400"), ("future", "MAXVALUE")])
    );
}

#[tokio::test]
async fn test_initialize_partitioning_dry_run_leaves_table_untouched() {
    let fake = Arc::new(FakeMySql::new());
    let manager = manager(&fake, utc(2014, 3, 1));

    let outcome = manager
        .initialize_partitioning(&data(&[("until_2014_03_17", 1395014400)]), true)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        DdlOutcome::DryRun(
            "ALTER TABLE test_events PARTITION BY RANGE(timestamp) \
             (PARTITION until_2014_03_17 VALUES LESS THAN (1395014400),\
             PARTITION future VALUES LESS THAN (MAXVALUE))"
                .to_string()
        )
    );
    assert!(fake.statements().is_empty());
    assert!(fake.partitions(TEST_TABLE).is_empty());
}

#[tokio::test]
async fn test_initialize_partitioning_rejects_misused_future_name() {
    let fake = Arc::new(FakeMySql::new());
    let manager = manager(&fake, utc(2014, 3, 1));

    let mut bad = PartitionData::new();
    bad.insert("until_2014_03_17".to_string(), Boundary::MaxValue);
    let err = manager.initialize_partitioning(&bad, false).await.unwrap_err();

    assert!(matches!(err, PartitionError::InvalidArgument(_)));
    assert!(fake.statements().is_empty());
}

#[tokio::test]
async fn test_drop_partitions_protects_current_and_future() {
    let fake = Arc::new(FakeMySql::new());
    // 参考时间位于两个上界之间，until_2014_04_17 是当前分区
    let manager = manager(&fake, utc(2014, 3, 20));
    manager
        .initialize_partitioning(
            &data(&[
                ("until_2014_03_17", 1395014400),
                ("until_2014_04_17", 1397692800),
            ]),
            false,
        )
        .await
        .unwrap();

    let err = manager
        .drop_partitions(&["until_2014_04_17".to_string()], false)
        .await
        .unwrap_err();
    assert!(matches!(err, PartitionError::InvalidArgument(_)));

    let err = manager
        .drop_partitions(&["future".to_string()], false)
        .await
        .unwrap_err();
    assert!(matches!(err, PartitionError::InvalidArgument(_)));
    assert_eq!(fake.ddl_statements().len(), 1);

    let outcome = manager
        .drop_partitions(&["until_2014_03_17".to_string()], false)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DdlOutcome::Executed("ALTER TABLE test_events DROP PARTITION until_2014_03_17".to_string())
    );
    assert_eq!(
        fake.partitions(TEST_TABLE),
        pairs(&[("until_2014_04_17", "1397692800"), ("future", "MAXVALUE")])
    );
}

#[tokio::test]
async fn test_every_older_partition_can_be_dropped() {
    let (fake, manager) = monthly_fixture(utc(2014, 4, 20)).await;

    // 当前分区是 until_2014_05_18，它之前的分区都允许删除
    let names: Vec<String> = ["until_2014_02_18", "until_2014_03_18", "until_2014_04_18"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let outcome = manager.drop_partitions(&names, false).await.unwrap();

    assert!(outcome.is_executed());
    assert_eq!(
        fake.partition_names(TEST_TABLE),
        vec!["until_2014_05_18", "future"]
    );
}

#[tokio::test]
async fn test_database_errors_pass_through_unmodified() {
    let (fake, manager) = monthly_fixture(utc(2014, 4, 20)).await;

    let err = manager
        .drop_partitions(&["until_2013_01_01".to_string()], false)
        .await
        .unwrap_err();
    match err {
        PartitionError::DatabaseStatementFailed(msg) => {
            assert_eq!(msg, "Error in list of partitions to DROP")
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(fake.partition_names(TEST_TABLE).len(), 5);
}

#[tokio::test]
async fn test_empty_requests_generate_no_ddl() {
    let (fake, manager) = monthly_fixture(utc(2014, 4, 20)).await;
    let executed_before = fake.statements().len();

    let dropped = manager.drop_partitions(&[], false).await.unwrap();
    let reorganized = manager
        .reorg_future_partition(&PartitionData::new(), false)
        .await
        .unwrap();

    assert_eq!(dropped, DdlOutcome::Skipped);
    assert_eq!(reorganized, DdlOutcome::Skipped);
    assert_eq!(fake.statements().len(), executed_before);
}

#[tokio::test]
async fn test_append_requires_initialized_partitioning() {
    let fake = Arc::new(FakeMySql::new());
    let manager = manager(&fake, utc(2014, 4, 18));

    // 未分区的表
    let err = manager
        .append_partition_intervals(CalendarUnit::Month, 1, 30, false)
        .await
        .unwrap_err();
    assert!(matches!(err, PartitionError::PreconditionFailed(_)));
    assert!(err.to_string().contains("initialized"));

    // 只有 future 分区
    manager
        .initialize_partitioning(&PartitionData::new(), false)
        .await
        .unwrap();
    assert_eq!(fake.partition_names(TEST_TABLE), vec!["future"]);

    let err = manager
        .append_partition_intervals(CalendarUnit::Month, 1, 30, false)
        .await
        .unwrap_err();
    assert!(matches!(err, PartitionError::PreconditionFailed(_)));
    assert!(err.to_string().contains("initialized"));
}

#[tokio::test]
async fn test_initialize_in_intervals_then_append() {
    let fake = Arc::new(FakeMySql::new());
    let manager = manager(&fake, utc(2014, 4, 18));

    let applied = manager
        .initialize_partitioning_in_intervals(CalendarUnit::Month, 1, 30, false)
        .await
        .unwrap();
    assert_eq!(applied.plan, data(&[("until_2014_05_18", ts(2014, 5, 18))]));
    assert_eq!(
        fake.partition_names(TEST_TABLE),
        vec!["until_2014_05_18", "future"]
    );

    // 已经覆盖到 30 天之后
    let applied = manager
        .append_partition_intervals(CalendarUnit::Month, 1, 30, false)
        .await
        .unwrap();
    assert!(applied.plan.is_empty());
    assert_eq!(applied.outcome, DdlOutcome::Skipped);

    let applied = manager
        .append_partition_intervals(CalendarUnit::Month, 1, 60, false)
        .await
        .unwrap();
    assert_eq!(applied.plan, data(&[("until_2014_06_18", ts(2014, 6, 18))]));
    assert_eq!(
        applied.outcome.sql(),
        Some(
            "ALTER TABLE test_events REORGANIZE PARTITION future INTO \
             (PARTITION until_2014_06_18 VALUES LESS THAN (1403049600),\
             PARTITION future VALUES LESS THAN (MAXVALUE))"
        )
    );
    assert_eq!(
        fake.partition_names(TEST_TABLE),
        vec!["until_2014_05_18", "until_2014_06_18", "future"]
    );
}

#[tokio::test]
async fn test_initialize_in_intervals_spans_multiple_months() {
    let fake = Arc::new(FakeMySql::new());
    let manager = manager(&fake, utc(2014, 4, 18));

    let applied = manager
        .initialize_partitioning_in_intervals(CalendarUnit::Month, 1, 50, true)
        .await
        .unwrap();

    assert_eq!(
        applied.plan,
        data(&[
            ("until_2014_05_18", ts(2014, 5, 18)),
            ("until_2014_06_18", ts(2014, 6, 18)),
        ])
    );
    assert!(applied.outcome.is_dry_run());
}

#[tokio::test]
async fn test_initialize_relative_clamps_month_ends() {
    let fake = Arc::new(FakeMySql::new());
    let manager = manager(&fake, utc(2014, 3, 31));

    let applied = manager
        .initialize_partitioning_relative(CalendarUnit::Month, &[1, -1, 0], false)
        .await
        .unwrap();

    assert_eq!(applied.plan.len(), 3);
    assert_eq!(
        fake.partition_names(TEST_TABLE),
        vec![
            "until_2014_02_28",
            "until_2014_03_31",
            "until_2014_04_30",
            "future"
        ]
    );
}

#[tokio::test]
async fn test_drop_partitions_older_than_in_days() {
    let (fake, manager) = monthly_fixture(utc(2014, 4, 18)).await;

    let applied = manager
        .drop_partitions_older_than_in_days(40, false)
        .await
        .unwrap();
    assert_eq!(applied.plan, vec!["until_2014_02_18"]);
    assert!(applied.outcome.is_executed());
    assert_eq!(
        fake.partition_names(TEST_TABLE),
        vec![
            "until_2014_03_18",
            "until_2014_04_18",
            "until_2014_05_18",
            "future"
        ]
    );

    // 再次执行没有可删除的分区
    let applied = manager
        .drop_partitions_older_than_in_days(40, false)
        .await
        .unwrap();
    assert!(applied.plan.is_empty());
    assert_eq!(applied.outcome, DdlOutcome::Skipped);
}

#[tokio::test]
async fn test_drop_partitions_older_than_boundary_is_strict() {
    let (fake, manager) = monthly_fixture(utc(2014, 4, 20)).await;

    let applied = manager
        .drop_partitions_older_than(ts(2014, 3, 18), true)
        .await
        .unwrap();
    assert_eq!(applied.plan, vec!["until_2014_02_18"]);
    assert_eq!(
        applied.outcome,
        DdlOutcome::DryRun("ALTER TABLE test_events DROP PARTITION until_2014_02_18".to_string())
    );
    assert_eq!(fake.partition_names(TEST_TABLE).len(), 5);
}

#[tokio::test]
async fn test_drop_older_than_refuses_to_include_current_partition() {
    let (fake, manager) = monthly_fixture(utc(2014, 4, 20)).await;

    let err = manager
        .drop_partitions_older_than(ts(2014, 6, 1), false)
        .await
        .unwrap_err();
    assert!(matches!(err, PartitionError::InvalidArgument(_)));
    assert_eq!(fake.partition_names(TEST_TABLE).len(), 5);
}

#[tokio::test]
async fn test_partitions_older_and_newer_than() {
    let (_fake, manager) = monthly_fixture(utc(2014, 4, 1)).await;

    assert_eq!(
        manager.partitions_older_than(ts(2014, 4, 18)).await.unwrap(),
        vec!["until_2014_02_18", "until_2014_03_18"]
    );
    // until_2014_04_18 是当前分区，不计入
    assert_eq!(
        manager.partitions_newer_than(ts(2014, 3, 18)).await.unwrap(),
        vec!["until_2014_03_18", "until_2014_05_18"]
    );

    let partitions = manager.partitions().await.unwrap();
    assert_eq!(
        partitions.current(manager.current_timestamp()).unwrap().name,
        "until_2014_04_18"
    );
    manager.display_partition_info().await.unwrap();
}

#[tokio::test]
async fn test_create_partition() {
    let fake = Arc::new(FakeMySql::new());
    fake.seed_partitions(
        TEST_TABLE,
        &[("until_2014_03_17", Boundary::Bounded(1395014400))],
    );
    let manager = manager(&fake, utc(2014, 3, 1));

    let outcome = manager.create_partition(1397692800, false).await.unwrap();
    assert_eq!(
        outcome.sql(),
        Some(
            "ALTER TABLE test_events ADD PARTITION \
             (PARTITION until_2014_04_17 VALUES LESS THAN (1397692800))"
        )
    );
    assert_eq!(
        fake.partitions(TEST_TABLE),
        pairs(&[
            ("until_2014_03_17", "1395014400"),
            ("until_2014_04_17", "1397692800")
        ])
    );

    // 不递增的上界被数据库拒绝
    let err = manager.create_partition(1395014400, false).await.unwrap_err();
    assert!(matches!(err, PartitionError::DatabaseStatementFailed(_)));

    let err = manager.create_partition(-1, false).await.unwrap_err();
    assert!(matches!(err, PartitionError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_planning_is_idempotent() {
    let (fake, manager) = monthly_fixture(utc(2014, 4, 18)).await;
    let before = fake.statements().len();

    let first = manager
        .append_partition_intervals(CalendarUnit::Day, 10, 90, true)
        .await
        .unwrap();
    let second = manager
        .append_partition_intervals(CalendarUnit::Day, 10, 90, true)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(!first.plan.is_empty());
    assert_eq!(fake.statements().len(), before);
}

#[tokio::test]
async fn test_lock_wait_timeout_is_restored() {
    let fake = Arc::new(FakeMySql::new());
    let manager = manager(&fake, utc(2014, 3, 1)).with_lock_wait_timeout(5);

    manager
        .initialize_partitioning(&data(&[("until_2014_03_17", 1395014400)]), false)
        .await
        .unwrap();

    let statements = fake.statements();
    assert_eq!(statements.len(), 3);
    assert_eq!(statements[0], "SET @@local.lock_wait_timeout = 5");
    assert!(statements[1].starts_with("ALTER TABLE test_events PARTITION BY"));
    assert_eq!(statements[2], "SET @@local.lock_wait_timeout = 50");
    assert_eq!(fake.lock_wait_timeout(), 50);

    // 语句失败时同样恢复
    fake.fail_statements_containing("REORGANIZE", "Lock wait timeout exceeded; try restarting transaction");
    let err = manager
        .append_partition_intervals(CalendarUnit::Month, 1, 60, false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Lock wait timeout exceeded"));
    assert_eq!(fake.lock_wait_timeout(), 50);
}

#[tokio::test]
async fn test_micro_seconds_time_unit() {
    setup_logging();
    let fake = Arc::new(FakeMySql::new());
    let adapter: Arc<dyn Adapter> = fake.clone();
    let manager = PartitionsManager::new(adapter, TEST_TABLE, TimeUnit::MicroSeconds)
        .unwrap()
        .with_current_time(utc(2014, 4, 18));

    let applied = manager
        .initialize_partitioning_in_intervals(CalendarUnit::Month, 1, 30, false)
        .await
        .unwrap();

    assert_eq!(
        applied.plan,
        data(&[("until_2014_05_18", ts(2014, 5, 18) * 1_000_000)])
    );
    assert_eq!(
        fake.partitions(TEST_TABLE)[0],
        (
            "until_2014_05_18".to_string(),
            (ts(2014, 5, 18) * 1_000_000).to_string()
        )
    );
}
