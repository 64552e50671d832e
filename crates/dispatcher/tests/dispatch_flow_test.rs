use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use dispatch_core::{models::CourierStatus, traits::DeliveryDispatcher, DispatchError};
use dispatch_dispatcher::{DispatchEngine, ExpirySweeper, OrderEventReactor, ReactorOutcome};
use dispatch_infrastructure::MetricsCollector;
use dispatch_testing_utils::{ManualClock, ScriptedOrderGateway, TestStore};

fn engine(store: &TestStore) -> Arc<DispatchEngine> {
    Arc::new(DispatchEngine::new(
        store.deliveries.clone(),
        Arc::new(MetricsCollector::new()),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_assign_never_double_binds() {
    let store = TestStore::new();
    store.seed_couriers(5, "car").await;
    let engine = engine(&store);

    let tasks: Vec<_> = (0..12)
        .map(|n| {
            let engine = engine.clone();
            tokio::spawn(async move { engine.assign(&format!("order-{n}")).await })
        })
        .collect();

    let mut bound = Vec::new();
    let mut exhausted = 0;
    for result in futures::future::join_all(tasks).await {
        match result.unwrap() {
            Ok(assignment) => bound.push(assignment.courier.id),
            Err(DispatchError::NoCourierAvailable) => exhausted += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(bound.len(), 5);
    assert_eq!(exhausted, 7);
    let distinct: HashSet<i64> = bound.iter().copied().collect();
    assert_eq!(distinct.len(), 5);

    let active = store.deliveries.list_active().await.unwrap();
    assert_eq!(active.len(), 5);
    for courier in store.couriers.list().await.unwrap() {
        assert_eq!(courier.status, CourierStatus::Busy);
    }
}

#[tokio::test]
async fn test_replayed_created_event_does_not_duplicate() {
    let store = TestStore::new();
    store.seed_couriers(2, "scooter").await;
    let gateway = Arc::new(ScriptedOrderGateway::new().with_status("o-1", "created"));
    let reactor = OrderEventReactor::new(gateway, engine(&store));

    let first = reactor.handle_event("o-1").await.unwrap();
    let replay = reactor.handle_event("o-1").await.unwrap();

    assert_eq!(first, replay);
    assert_eq!(store.store.deliveries().await.len(), 1);
}

#[tokio::test]
async fn test_cancel_after_assign_frees_courier() {
    let store = TestStore::new();
    let courier = store.seed_couriers(1, "on_foot").await.remove(0);
    let gateway = Arc::new(
        ScriptedOrderGateway::new()
            .with_status("o-1", "created")
            .with_status("o-1", "cancelled"),
    );
    let reactor = OrderEventReactor::new(gateway, engine(&store));

    assert!(matches!(
        reactor.handle_event("o-1").await.unwrap(),
        ReactorOutcome::Assigned { courier_id } if courier_id == courier.id
    ));
    assert_eq!(
        reactor.handle_event("o-1").await.unwrap(),
        ReactorOutcome::Unassigned
    );
    // A duplicate cancel finds nothing left to release.
    assert_eq!(
        reactor.handle_event("o-1").await.unwrap(),
        ReactorOutcome::NothingToRelease
    );

    let stored = store.couriers.get_by_id(courier.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CourierStatus::Available);
}

#[tokio::test]
async fn test_replayed_created_event_after_expiry_is_settled() {
    let store = TestStore::new();
    let courier = store.seed_couriers(1, "car").await.remove(0);
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let metrics = Arc::new(MetricsCollector::new());
    let engine = Arc::new(
        DispatchEngine::new(store.deliveries.clone(), metrics.clone()).with_clock(clock.clone()),
    );
    let gateway = Arc::new(ScriptedOrderGateway::new().with_status("o-1", "created"));
    let reactor = OrderEventReactor::new(gateway, engine);
    let sweeper = ExpirySweeper::new(store.couriers.clone(), metrics, Duration::from_secs(10))
        .with_clock(clock.clone());

    assert!(matches!(
        reactor.handle_event("o-1").await.unwrap(),
        ReactorOutcome::Assigned { .. }
    ));

    clock.advance(ChronoDuration::minutes(6));
    assert_eq!(sweeper.sweep_once().await.unwrap(), 1);

    // Upstream still says "created"; the late duplicate must not error.
    assert_eq!(
        reactor.handle_event("o-1").await.unwrap(),
        ReactorOutcome::AlreadyClosed
    );

    let stored = store.couriers.get_by_id(courier.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CourierStatus::Available);
    assert!(store.deliveries.list_active().await.unwrap().is_empty());
}
