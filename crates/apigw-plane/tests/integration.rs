//! Integration Tests for the Control Plane services
//!
//! These tests drive the three services over real stores:
//! - Permission composition across gateway-wide and resource grants
//! - Public key distribution
//! - Publish event ledger appends and step ranking
//! - Storage failure, cancellation and deadline classification

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use apigw_core::{
    EventDetail, GatewayPublicKey, InstanceIdentity, PermissionGrant, PublishEvent,
    PublishEventReport, PublishEventStatus,
};
use apigw_plane::{
    ControlStore, MemoryStore, PermissionGrantFilter, PermissionQuery, PermissionService,
    PublicKeyService, PublishEventService, RequestContext, ServiceError, StorageError,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn shared_instance() -> InstanceIdentity {
    InstanceIdentity::shared("micro-gateway-1")
}

fn report(
    publish_id: i64,
    step: &str,
    status: PublishEventStatus,
    detail: serde_json::Value,
) -> PublishEventReport {
    PublishEventReport {
        publish_id,
        gateway_name: "benchmark".into(),
        stage_name: "dev".into(),
        step_name: step.into(),
        status,
        detail: serde_json::from_value(detail).unwrap(),
    }
}

/// Store whose every call fails like an unreachable database
#[derive(Debug)]
struct BrokenStore;

#[async_trait]
impl ControlStore for BrokenStore {
    async fn find_permission_grants(
        &self,
        _ctx: &RequestContext,
        _filter: &PermissionGrantFilter,
    ) -> Result<Vec<PermissionGrant>, StorageError> {
        Err(StorageError::Database("connection reset".into()))
    }

    async fn find_public_key(
        &self,
        _ctx: &RequestContext,
        _gateway_name: &str,
    ) -> Result<GatewayPublicKey, StorageError> {
        Err(StorageError::Connection("pool timed out".into()))
    }

    async fn insert_publish_event(
        &self,
        _ctx: &RequestContext,
        _event: &PublishEvent,
    ) -> Result<(), StorageError> {
        Err(StorageError::Database("disk full".into()))
    }

    async fn ping(&self, _ctx: &RequestContext) -> Result<(), StorageError> {
        Err(StorageError::Connection("refused".into()))
    }
}

/// Store that takes far longer than any request deadline
#[derive(Debug)]
struct StalledStore;

impl StalledStore {
    async fn stall(ctx: &RequestContext) -> Result<(), StorageError> {
        ctx.run(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<(), StorageError>(())
        })
        .await
    }
}

#[async_trait]
impl ControlStore for StalledStore {
    async fn find_permission_grants(
        &self,
        ctx: &RequestContext,
        _filter: &PermissionGrantFilter,
    ) -> Result<Vec<PermissionGrant>, StorageError> {
        Self::stall(ctx).await?;
        Ok(vec![])
    }

    async fn find_public_key(
        &self,
        ctx: &RequestContext,
        gateway_name: &str,
    ) -> Result<GatewayPublicKey, StorageError> {
        Self::stall(ctx).await?;
        Err(StorageError::NotFound(gateway_name.into()))
    }

    async fn insert_publish_event(
        &self,
        ctx: &RequestContext,
        _event: &PublishEvent,
    ) -> Result<(), StorageError> {
        Self::stall(ctx).await
    }

    async fn ping(&self, ctx: &RequestContext) -> Result<(), StorageError> {
        Self::stall(ctx).await
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_scenario_stage_grant_answers_gateway_key_only() {
    let store = MemoryStore::new();
    store
        .put_grant(
            PermissionGrant::gateway_wide("benchmark", "bk_apigateway", 1681897413).in_stage("dev"),
        )
        .unwrap();
    let svc = PermissionService::new(Arc::new(store));

    let query = PermissionQuery::new("benchmark", "dev", "bk_apigateway").with_resource("app_verify");
    let perms = svc
        .query(&RequestContext::background(), &shared_instance(), &query)
        .await
        .unwrap();

    assert_eq!(perms.len(), 1);
    assert_eq!(perms.get("benchmark:-:bk_apigateway"), Some(&1681897413));
    assert!(!perms.contains_key("benchmark:app_verify:bk_apigateway"));
}

#[tokio::test]
async fn test_scenario_two_reports_two_ranked_records() {
    let store = Arc::new(MemoryStore::new());
    let svc = PublishEventService::new(store.clone());
    let ctx = RequestContext::background();

    svc.report(&ctx, report(42, "parse_configuration", PublishEventStatus::Doing, json!({})))
        .await
        .unwrap();
    svc.report(
        &ctx,
        report(42, "apply_configuration", PublishEventStatus::Success, json!({"took_ms": 120})),
    )
    .await
    .unwrap();

    let events = store.publish_events_for(42).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].step_rank(), 3);
    assert_eq!(events[1].step_rank(), 4);
    assert_eq!(events[1].detail.get("took_ms"), Some(&json!(120)));
}

#[tokio::test]
async fn test_scenario_unknown_gateway_key_not_found() {
    let svc = PublicKeyService::new(Arc::new(MemoryStore::new()));
    let err = svc
        .get_by_gateway_name(&RequestContext::background(), "ghost")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

// =============================================================================
// Permission Properties
// =============================================================================

#[tokio::test]
async fn test_grants_of_other_pairs_do_not_leak() {
    let store = MemoryStore::new();
    store
        .put_grant(PermissionGrant::gateway_wide("benchmark", "someone_else", 1))
        .unwrap();
    store
        .put_grant(PermissionGrant::gateway_wide("other", "demo", 1))
        .unwrap();
    let svc = PermissionService::new(Arc::new(store));

    let err = svc
        .query(
            &RequestContext::background(),
            &shared_instance(),
            &PermissionQuery::new("benchmark", "dev", "demo"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_expiry_reported_exactly() {
    let store = MemoryStore::new();
    for (i, expires_at) in [0_i64, 1, 1681897413, i64::MAX].into_iter().enumerate() {
        store
            .put_grant(PermissionGrant::for_resource(
                "benchmark",
                format!("res-{i}"),
                "demo",
                expires_at,
            ))
            .unwrap();
    }
    let svc = PermissionService::new(Arc::new(store));
    let ctx = RequestContext::background();

    for (i, expires_at) in [0_i64, 1, 1681897413, i64::MAX].into_iter().enumerate() {
        let query = PermissionQuery::new("benchmark", "prod", "demo").with_resource(format!("res-{i}"));
        let perms = svc.query(&ctx, &shared_instance(), &query).await.unwrap();
        assert_eq!(perms[&format!("benchmark:res-{i}:demo")], expires_at);
    }
}

#[tokio::test]
async fn test_gateway_and_resource_keys_independent() {
    let store = MemoryStore::new();
    store
        .put_grant(PermissionGrant::gateway_wide("benchmark", "demo", 100))
        .unwrap();
    store
        .put_grant(PermissionGrant::for_resource("benchmark", "echo", "demo", 200))
        .unwrap();
    let svc = PermissionService::new(Arc::new(store));

    let query = PermissionQuery::new("benchmark", "dev", "demo").with_resource("echo");
    let perms = svc
        .query(&RequestContext::background(), &shared_instance(), &query)
        .await
        .unwrap();

    assert_eq!(perms.len(), 2);
    assert_eq!(perms["benchmark:-:demo"], 100);
    assert_eq!(perms["benchmark:echo:demo"], 200);
}

#[tokio::test]
async fn test_dedicated_instance_serves_own_gateway() {
    let store = MemoryStore::new();
    store
        .put_grant(PermissionGrant::gateway_wide("benchmark", "demo", 7))
        .unwrap();
    let svc = PermissionService::new(Arc::new(store));
    let ctx = RequestContext::background();
    let query = PermissionQuery::new("benchmark", "dev", "demo");

    let own = InstanceIdentity::dedicated("mg-1", "benchmark");
    assert_eq!(svc.query(&ctx, &own, &query).await.unwrap()["benchmark:-:demo"], 7);

    let foreign = InstanceIdentity::dedicated("mg-2", "payments");
    assert!(matches!(
        svc.query(&ctx, &foreign, &query).await.unwrap_err(),
        ServiceError::NotFound(_)
    ));
}

// =============================================================================
// Ledger Properties
// =============================================================================

#[tokio::test]
async fn test_duplicate_step_reports_both_stored() {
    let store = Arc::new(MemoryStore::new());
    let svc = PublishEventService::new(store.clone());
    let ctx = RequestContext::background();

    svc.report(&ctx, report(9, "distribute_configuration", PublishEventStatus::Doing, json!({})))
        .await
        .unwrap();
    svc.report(&ctx, report(9, "distribute_configuration", PublishEventStatus::Failure, json!({"err": "timeout"})))
        .await
        .unwrap();

    let events = store.publish_events_for(9).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].status, PublishEventStatus::Doing);
    assert_eq!(events[1].status, PublishEventStatus::Failure);
    assert!(events.iter().all(|e| e.step_rank() == 2));
}

#[tokio::test]
async fn test_detail_stored_as_is() {
    let store = Arc::new(MemoryStore::new());
    let svc = PublishEventService::new(store.clone());
    let detail = json!({"nested": {"list": [1, "two", null]}, "flag": true});

    svc.report(
        &RequestContext::background(),
        report(11, "load_configuration", PublishEventStatus::Success, detail.clone()),
    )
    .await
    .unwrap();

    let events = store.publish_events_for(11).unwrap();
    let expected: EventDetail = serde_json::from_value(detail).unwrap();
    assert_eq!(events[0].detail, expected);
}

// =============================================================================
// Failure Classification
// =============================================================================

#[tokio::test]
async fn test_storage_failures_are_system_errors() {
    let store: Arc<dyn ControlStore> = Arc::new(BrokenStore);
    let ctx = RequestContext::background();

    let err = PermissionService::new(store.clone())
        .query(&ctx, &shared_instance(), &PermissionQuery::new("benchmark", "dev", "demo"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::System(_)));
    assert!(err.is_incident());

    let err = PublicKeyService::new(store.clone())
        .get_by_gateway_name(&ctx, "benchmark")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::System(_)));

    let err = PublishEventService::new(store)
        .report(&ctx, report(1, "parse_configuration", PublishEventStatus::Doing, json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::System(_)));
}

#[tokio::test]
async fn test_validation_precedes_storage() {
    let store: Arc<dyn ControlStore> = Arc::new(BrokenStore);
    let mut bad = report(1, "parse_configuration", PublishEventStatus::Doing, json!({}));
    bad.gateway_name.clear();

    let err = PublishEventService::new(store)
        .report(&RequestContext::background(), bad)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn test_cancelled_context_skips_storage() {
    let store = Arc::new(MemoryStore::new());
    let svc = PublishEventService::new(store.clone());
    let (ctx, handle) = RequestContext::cancellable();
    handle.cancel();

    let err = svc
        .report(&ctx, report(5, "parse_configuration", PublishEventStatus::Doing, json!({})))
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::Cancelled);
    assert!(!err.is_incident());
    assert!(store.publish_events().unwrap().is_empty());
}

#[tokio::test]
async fn test_deadline_abandons_stalled_storage() {
    let store: Arc<dyn ControlStore> = Arc::new(StalledStore);
    let ctx = RequestContext::with_timeout(Duration::from_millis(50));

    let err = PublicKeyService::new(store.clone())
        .get_by_gateway_name(&ctx, "benchmark")
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::DeadlineExceeded);

    let err = PermissionService::new(store)
        .query(
            &RequestContext::with_timeout(Duration::from_millis(50)),
            &shared_instance(),
            &PermissionQuery::new("benchmark", "dev", "demo"),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ServiceError::DeadlineExceeded);
}

#[tokio::test]
async fn test_cancel_abandons_stalled_storage() {
    let svc = PublishEventService::new(Arc::new(StalledStore));
    let (ctx, handle) = RequestContext::cancellable();

    let task = tokio::spawn(async move {
        svc.report(&ctx, report(6, "apply_configuration", PublishEventStatus::Doing, json!({})))
            .await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    handle.cancel();

    assert_eq!(task.await.unwrap().unwrap_err(), ServiceError::Cancelled);
}
