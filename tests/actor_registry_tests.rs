//! Actor registry tests
//!
//! Run with: cargo test --test actor_registry_tests

use actorstore::{
    ActorDraft, ActorPlatform, ActorStatus, ActorUpdate, IdKind, RegistryError, TaggedId, db_key,
};
use serde_json::json;
use tokio_test::assert_ok;

fn draft(tenant: &str) -> ActorDraft {
    ActorDraft::new("echo", "abaco/echo")
        .tenant(tenant)
        .owner("alice")
        .api_server("https://api.example.org")
}

#[tokio::test]
async fn test_generated_ids_are_tenant_scoped_keys() {
    let platform = ActorPlatform::in_memory();

    for tenant in ["t1", "t2", "tenant_with_separator"] {
        let actor = platform.actors().create(draft(tenant)).await.unwrap();
        assert!(!actor.id.is_empty());
        assert_eq!(actor.db_id, db_key(tenant, &actor.id));
        assert_eq!(TaggedId::kind_of(&actor.id), Some(IdKind::Actor));
    }
}

#[tokio::test]
async fn test_same_human_id_in_two_tenants() {
    let platform = ActorPlatform::in_memory();
    let first = platform.actors().create(draft("t1").id("a1")).await.unwrap();
    let second = platform.actors().create(draft("t2").id("a1")).await.unwrap();

    assert_ne!(first.db_id, second.db_id);
    assert_eq!(platform.actors().get("t1_a1").await.unwrap().tenant, "t1");
    assert_eq!(platform.actors().get("t2_a1").await.unwrap().tenant, "t2");
}

#[tokio::test]
async fn test_create_validates_before_writing() {
    let platform = ActorPlatform::in_memory();
    let missing_owner = ActorDraft::new("echo", "abaco/echo")
        .tenant("t1")
        .api_server("https://api.example.org");

    let err = platform.actors().create(missing_owner).await.unwrap_err();
    assert!(matches!(err, RegistryError::Validation(_)));
    assert!(platform.actors().list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_with_taken_id_conflicts() {
    let platform = ActorPlatform::in_memory();
    let first = assert_ok!(platform.actors().create(draft("t1").id("a1")).await);

    let err = platform
        .actors()
        .create(ActorDraft::new("other", "abaco/other").tenant("t1").owner("bob")
            .api_server("https://api.example.org").id("a1"))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Conflict(_)));
    assert_eq!(platform.actors().get("t1_a1").await.unwrap(), first);
}

#[tokio::test]
async fn test_create_from_fields() {
    let platform = ActorPlatform::in_memory();
    let fields = json!({
        "name": "word-count",
        "image": "abaco/wc",
        "tenant": "t1",
        "owner": "alice",
        "api_server": "https://api.example.org",
        "default_environment": {"LANG": "en"},
    });
    let actor = platform
        .actors()
        .create_from_fields(fields.as_object().unwrap().clone())
        .await
        .unwrap();
    assert_eq!(actor.default_environment["LANG"], "en");
    assert_eq!(actor.status, ActorStatus::Submitted);
}

#[tokio::test]
async fn test_get_unknown_actor() {
    let platform = ActorPlatform::in_memory();
    let err = platform.actors().get("t1_nobody").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Actor not found: t1_nobody");
}

#[tokio::test]
async fn test_update_keeps_identity_and_status() {
    let platform = ActorPlatform::in_memory();
    let actor = platform.actors().create(draft("t1").id("a1")).await.unwrap();
    assert_ok!(
        platform
            .actors()
            .set_status(&actor.db_id, ActorStatus::Ready)
            .await
    );

    let updated = platform
        .actors()
        .update(
            &actor.db_id,
            ActorUpdate::default()
                .image("abaco/echo:2")
                .description("second build"),
        )
        .await
        .unwrap();

    assert_eq!(updated.image, "abaco/echo:2");
    assert_eq!(updated.id, "a1");
    assert_eq!(updated.db_id, "t1_a1");
    assert_eq!(updated.status, ActorStatus::Ready);
    assert_eq!(platform.actors().get("t1_a1").await.unwrap(), updated);
}

#[tokio::test]
async fn test_delete_removes_only_the_actor() {
    let platform = ActorPlatform::in_memory();
    let actor = platform.actors().create(draft("t1")).await.unwrap();
    platform
        .permissions()
        .add_permission("alice", &actor.db_id, actorstore::PermissionLevel::Update)
        .await
        .unwrap();

    assert_ok!(platform.actors().delete(&actor.db_id).await);
    assert!(platform.actors().get(&actor.db_id).await.unwrap_err().is_not_found());
    // Dependents are the caller's to clean up.
    assert_eq!(
        platform.permissions().get_permissions(&actor.db_id).await.unwrap().len(),
        1
    );

    let err = platform.actors().delete(&actor.db_id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_recover_display_id() {
    let platform = ActorPlatform::in_memory();
    let actors = platform.actors();
    assert_eq!(actors.recover_display_id("t1", "t1_a1"), "a1");
    assert_eq!(actors.recover_display_id("t1", "t2_a1"), "t2_a1");
    assert_eq!(actors.recover_display_id("t1", "a1"), "a1");
}

#[tokio::test]
async fn test_list_filters_by_tenant() {
    let platform = ActorPlatform::in_memory();
    platform.actors().create(draft("t1").id("a")).await.unwrap();
    platform.actors().create(draft("t1").id("b")).await.unwrap();
    platform.actors().create(draft("t2").id("a")).await.unwrap();

    assert_eq!(platform.actors().list(None).await.unwrap().len(), 3);
    let t1: Vec<String> = platform
        .actors()
        .list(Some("t1"))
        .await
        .unwrap()
        .into_iter()
        .map(|actor| actor.db_id)
        .collect();
    assert_eq!(t1, vec!["t1_a", "t1_b"]);
}

#[tokio::test]
async fn test_cascade_delete() {
    let platform = ActorPlatform::in_memory();
    let actor = platform.actors().create(draft("t1").id("a1")).await.unwrap();
    let exec_id = platform
        .executions()
        .add_execution(&actor.db_id, actorstore::ExecutionDraft::with_usage(1, 1, 1))
        .await
        .unwrap();

    assert_ok!(platform.delete_actor_cascade(&actor.db_id).await);
    assert!(platform.actors().get("t1_a1").await.is_err());
    assert!(platform.workers().get_workers("t1_a1").await.unwrap().is_empty());
    assert!(
        platform
            .permissions()
            .get_permissions("t1_a1")
            .await
            .unwrap_err()
            .is_not_found()
    );
    // Recreating the actor starts with an empty history.
    platform.actors().create(draft("t1").id("a1")).await.unwrap();
    let err = platform
        .executions()
        .get_execution("t1_a1", &exec_id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = platform.delete_actor_cascade("t1_nobody").await.unwrap_err();
    assert!(err.is_not_found());
}
