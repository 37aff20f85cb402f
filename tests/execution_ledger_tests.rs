//! Execution ledger tests
//!
//! Run with: cargo test --test execution_ledger_tests

use actorstore::{
    ActorDraft, ActorPlatform, ExecutionDraft, ExecutionStats, ExecutionStatus, IdKind, KvStore,
    RegistryError, StoreConfig, StoreSet, TaggedId,
};
use serde_json::{Map, Value, json};
use std::time::Duration;

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

async fn platform_with_actor() -> ActorPlatform {
    let platform = ActorPlatform::in_memory();
    platform
        .actors()
        .create(
            ActorDraft::new("echo", "abaco/echo")
                .tenant("t1")
                .owner("alice")
                .api_server("https://api.example.org")
                .id("a1"),
        )
        .await
        .unwrap();
    platform
}

#[tokio::test]
async fn test_submit_finalize_summarize_scenario() {
    let platform = platform_with_actor().await;
    let ledger = platform.executions();

    let e1 = ledger
        .add_execution_fields("t1_a1", fields(json!({"runtime": "120", "cpu": "30", "io": "5"})))
        .await
        .unwrap();
    assert_eq!(TaggedId::kind_of(&e1), Some(IdKind::Execution));
    assert_eq!(
        ledger.get_execution("t1_a1", &e1).await.unwrap().status,
        ExecutionStatus::Submitted
    );

    let stats = ExecutionStats::from_fields(fields(json!({"io": "7", "cpu": "31", "runtime": "125"})))
        .unwrap();
    ledger
        .finalize_execution("t1_a1", &e1, ExecutionStatus::Complete, stats)
        .await
        .unwrap();

    let summary = ledger.summarize("t1_a1").await.unwrap();
    assert_eq!(summary.total_executions, 1);
    assert_eq!(summary.total_cpu, 31);
    assert_eq!(summary.total_io, 7);
    assert_eq!(summary.total_runtime, 125);
    assert_eq!(summary.ids, vec![e1.clone()]);
    assert_eq!(summary.actor_id, "a1");
    assert_eq!(summary.db_id, "t1_a1");
    assert_eq!(summary.owner, "alice");

    let finalized = ledger.get_execution("t1_a1", &e1).await.unwrap();
    assert_eq!(finalized.status, ExecutionStatus::Complete);
    assert_eq!((finalized.io, finalized.cpu, finalized.runtime), (7, 31, 125));
}

#[tokio::test]
async fn test_each_add_appears_once_in_summary() {
    let platform = platform_with_actor().await;
    let ledger = platform.executions();

    let mut expected = Vec::new();
    for n in 0..5u64 {
        let before = ledger.summarize("t1_a1").await.unwrap().total_executions;
        let id = ledger
            .add_execution("t1_a1", ExecutionDraft::with_usage(n, n, n))
            .await
            .unwrap();
        let summary = ledger.summarize("t1_a1").await.unwrap();
        assert_eq!(summary.total_executions, before + 1);
        assert_eq!(summary.ids.iter().filter(|seen| **seen == id).count(), 1);
        expected.push(id);
    }

    let summary = ledger.summarize("t1_a1").await.unwrap();
    assert_eq!(summary.ids, expected);
    assert_eq!(summary.total_cpu, 10);
}

#[tokio::test]
async fn test_summarize_empty_history() {
    let platform = platform_with_actor().await;
    let summary = platform.executions().summarize("t1_a1").await.unwrap();
    assert_eq!(summary.total_executions, 0);
    assert!(summary.ids.is_empty());
    assert!(platform.executions().list_executions("t1_a1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_finalize_unknown_execution_leaves_summary_unchanged() {
    let platform = platform_with_actor().await;
    let ledger = platform.executions();
    ledger
        .add_execution("t1_a1", ExecutionDraft::with_usage(10, 2, 3))
        .await
        .unwrap();
    let before = ledger.summarize("t1_a1").await.unwrap();

    let unknown = TaggedId::generate(IdKind::Execution).to_string();
    let err = ledger
        .finalize_execution("t1_a1", &unknown, ExecutionStatus::Complete, ExecutionStats::new(1, 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { kind: "Execution", .. }));
    assert_eq!(ledger.summarize("t1_a1").await.unwrap(), before);
}

#[tokio::test]
async fn test_finalize_with_incomplete_stats_mutates_nothing() {
    let platform = platform_with_actor().await;
    let ledger = platform.executions();
    let id = ledger
        .add_execution("t1_a1", ExecutionDraft::with_usage(10, 2, 3))
        .await
        .unwrap();

    for partial in [
        json!({"cpu": 1, "runtime": 1}),
        json!({"io": 1, "runtime": 1}),
        json!({"io": 1, "cpu": 1}),
    ] {
        let stats = ExecutionStats::from_fields(fields(partial)).unwrap();
        let err = ledger
            .finalize_execution("t1_a1", &id, ExecutionStatus::Complete, stats)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Validation(_)));
    }

    let execution = ledger.get_execution("t1_a1", &id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Submitted);
    assert_eq!((execution.runtime, execution.cpu, execution.io), (10, 2, 3));
}

#[tokio::test]
async fn test_add_execution_rejects_bad_counters() {
    let platform = platform_with_actor().await;
    let ledger = platform.executions();

    let err = ledger
        .add_execution_fields("t1_a1", fields(json!({"runtime": "ten", "cpu": 1, "io": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));

    let err = ledger
        .add_execution_fields("t1_a1", fields(json!({"runtime": 1, "cpu": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));
    assert_eq!(ledger.summarize("t1_a1").await.unwrap().total_executions, 0);
}

#[tokio::test]
async fn test_logs_keyed_by_execution_id() {
    let platform = ActorPlatform::new(
        StoreSet::in_memory(),
        StoreConfig::new().log_expiry_seconds(3600),
    );
    let ledger = platform.executions();
    assert_eq!(ledger.log_expiry(), Some(Duration::from_secs(3600)));

    let exec_id = TaggedId::generate(IdKind::Execution).to_string();
    ledger.set_logs(&exec_id, "line 1\nline 2", None).await.unwrap();
    assert_eq!(ledger.get_logs(&exec_id).await.unwrap(), "line 1\nline 2");

    let ttl = platform.stores().logs().ttl(&exec_id).await.unwrap();
    assert!(ttl.is_some_and(|ttl| ttl <= Duration::from_secs(3600)));

    ledger.set_logs(&exec_id, "replaced", Some(-1)).await.unwrap();
    assert_eq!(platform.stores().logs().ttl(&exec_id).await.unwrap(), None);
}

#[tokio::test]
async fn test_expired_logs_are_gone() {
    let platform = ActorPlatform::in_memory();
    let ledger = platform.executions();
    let exec_id = TaggedId::generate(IdKind::Execution).to_string();

    platform
        .stores()
        .logs()
        .set_with_expiry(&exec_id, json!("short lived"), Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(ledger.get_logs(&exec_id).await.unwrap(), "short lived");

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(ledger.get_logs(&exec_id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_add_rejects_terminal_status() {
    let platform = platform_with_actor().await;
    let ledger = platform.executions();

    let err = ledger
        .add_execution_fields(
            "t1_a1",
            fields(json!({"runtime": 1, "cpu": 1, "io": 1, "status": "COMPLETE"})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));
    assert!(ledger.list_executions("t1_a1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_finalized_execution_cannot_be_overwritten_by_add() {
    let platform = platform_with_actor().await;
    let ledger = platform.executions();

    let e1 = ledger
        .add_execution("t1_a1", ExecutionDraft::with_usage(120, 30, 5))
        .await
        .unwrap();
    ledger
        .finalize_execution("t1_a1", &e1, ExecutionStatus::Complete, ExecutionStats::new(7, 31, 125))
        .await
        .unwrap();

    let err = ledger
        .add_execution_fields("t1_a1", fields(json!({"runtime": 0, "cpu": 0, "io": 0, "id": e1})))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));

    let kept = ledger.get_execution("t1_a1", &e1).await.unwrap();
    assert_eq!(kept.status, ExecutionStatus::Complete);
    assert_eq!(kept.cpu, 31);
    let summary = ledger.summarize("t1_a1").await.unwrap();
    assert_eq!((summary.total_executions, summary.total_cpu), (1, 31));
}
