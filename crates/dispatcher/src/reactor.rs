use std::sync::Arc;

use dispatch_core::{
    models::OrderStatus,
    traits::{DeliveryDispatcher, OrderGateway},
    DispatchError, DispatchResult,
};
use tracing::{debug, info};

/// What the reactor did with one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactorOutcome {
    Assigned { courier_id: i64 },
    Unassigned,
    Completed,
    /// A cancel/complete arrived for an order with no active delivery.
    NothingToRelease,
    /// A create arrived for an order whose delivery already ended
    /// (completed or expired).
    AlreadyClosed,
    /// Upstream does not know the order.
    UnknownOrder,
    /// Upstream reported a status we do not act on.
    Ignored(String),
}

impl ReactorOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReactorOutcome::Assigned { .. } => "assigned",
            ReactorOutcome::Unassigned => "unassigned",
            ReactorOutcome::Completed => "completed",
            ReactorOutcome::NothingToRelease => "nothing_to_release",
            ReactorOutcome::AlreadyClosed => "already_closed",
            ReactorOutcome::UnknownOrder => "unknown_order",
            ReactorOutcome::Ignored(_) => "ignored",
        }
    }
}

/// Turns order change notifications into dispatch operations.
///
/// The status carried by a notification is never trusted; the current one
/// is fetched from the gateway each time, which makes stale and duplicate
/// notifications harmless.
pub struct OrderEventReactor {
    gateway: Arc<dyn OrderGateway>,
    dispatcher: Arc<dyn DeliveryDispatcher>,
}

impl OrderEventReactor {
    pub fn new(gateway: Arc<dyn OrderGateway>, dispatcher: Arc<dyn DeliveryDispatcher>) -> Self {
        Self {
            gateway,
            dispatcher,
        }
    }

    pub async fn handle_event(&self, order_id: &str) -> DispatchResult<ReactorOutcome> {
        let raw = match self.gateway.fetch_status(order_id).await {
            Ok(raw) => raw,
            Err(DispatchError::OrderNotFound { .. }) => {
                debug!(order_id, "order unknown upstream, skipping");
                return Ok(ReactorOutcome::UnknownOrder);
            }
            Err(e) => return Err(e),
        };

        let outcome = match OrderStatus::parse(&raw) {
            OrderStatus::Created => match self.dispatcher.assign(order_id).await {
                Ok(assignment) => ReactorOutcome::Assigned {
                    courier_id: assignment.courier.id,
                },
                Err(DispatchError::DeliveryAlreadyClosed { .. }) => ReactorOutcome::AlreadyClosed,
                Err(e) => return Err(e),
            },
            OrderStatus::Cancelled => {
                release(self.dispatcher.unassign(order_id).await, ReactorOutcome::Unassigned)?
            }
            OrderStatus::Completed => {
                release(self.dispatcher.complete(order_id).await, ReactorOutcome::Completed)?
            }
            OrderStatus::Unrecognized(status) => ReactorOutcome::Ignored(status),
        };

        info!(order_id, outcome = outcome.label(), "order event handled");
        Ok(outcome)
    }
}

fn release<T>(result: DispatchResult<T>, done: ReactorOutcome) -> DispatchResult<ReactorOutcome> {
    match result {
        Ok(_) => Ok(done),
        Err(DispatchError::DeliveryNotFound { .. }) => Ok(ReactorOutcome::NothingToRelease),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_testing_utils::{
        DispatchCall, GatewayReply, RecordingDispatcher, ScriptedFailure, ScriptedOrderGateway,
    };

    fn reactor(
        gateway: ScriptedOrderGateway,
    ) -> (OrderEventReactor, Arc<RecordingDispatcher>) {
        let dispatcher = Arc::new(RecordingDispatcher::new());
        (
            OrderEventReactor::new(Arc::new(gateway), dispatcher.clone()),
            dispatcher,
        )
    }

    #[tokio::test]
    async fn test_created_assigns_exactly_once() {
        let (reactor, dispatcher) = reactor(ScriptedOrderGateway::new().with_status("o-1", "created"));

        let outcome = reactor.handle_event("o-1").await.unwrap();

        assert!(matches!(outcome, ReactorOutcome::Assigned { .. }));
        assert_eq!(dispatcher.calls(), vec![DispatchCall::Assign("o-1".into())]);
    }

    #[tokio::test]
    async fn test_status_is_parsed_case_insensitively() {
        let (reactor, dispatcher) =
            reactor(ScriptedOrderGateway::new().with_status("o-1", "Canceled"));

        assert_eq!(reactor.handle_event("o-1").await.unwrap(), ReactorOutcome::Unassigned);
        assert_eq!(dispatcher.calls(), vec![DispatchCall::Unassign("o-1".into())]);
    }

    #[tokio::test]
    async fn test_unknown_order_does_not_dispatch() {
        let (reactor, dispatcher) = reactor(ScriptedOrderGateway::new());

        assert_eq!(reactor.handle_event("ghost").await.unwrap(), ReactorOutcome::UnknownOrder);
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_release_without_delivery_is_swallowed() {
        let (reactor, dispatcher) = reactor(
            ScriptedOrderGateway::new()
                .with_status("o-1", "cancelled")
                .with_status("o-2", "completed"),
        );
        dispatcher.fail_unassign(ScriptedFailure::DeliveryNotFound);
        dispatcher.fail_complete(ScriptedFailure::DeliveryNotFound);

        assert_eq!(reactor.handle_event("o-1").await.unwrap(), ReactorOutcome::NothingToRelease);
        assert_eq!(reactor.handle_event("o-2").await.unwrap(), ReactorOutcome::NothingToRelease);
    }

    #[tokio::test]
    async fn test_unrecognized_status_is_ignored() {
        let (reactor, dispatcher) =
            reactor(ScriptedOrderGateway::new().with_status("o-1", "in_transit"));

        assert_eq!(
            reactor.handle_event("o-1").await.unwrap(),
            ReactorOutcome::Ignored("in_transit".into())
        );
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let gateway = ScriptedOrderGateway::new();
        gateway.script("o-1", GatewayReply::Transient);
        let (reactor, _) = reactor(gateway);

        assert!(matches!(
            reactor.handle_event("o-1").await.unwrap_err(),
            DispatchError::TransientNetwork(_)
        ));
    }

    #[tokio::test]
    async fn test_assign_failure_propagates() {
        let (reactor, dispatcher) = reactor(ScriptedOrderGateway::new().with_status("o-1", "created"));
        dispatcher.fail_assign(ScriptedFailure::NoCourierAvailable);

        assert!(matches!(
            reactor.handle_event("o-1").await.unwrap_err(),
            DispatchError::NoCourierAvailable
        ));
    }

    #[tokio::test]
    async fn test_create_for_closed_delivery_is_swallowed() {
        let (reactor, dispatcher) = reactor(ScriptedOrderGateway::new().with_status("o-1", "created"));
        dispatcher.fail_assign(ScriptedFailure::AlreadyClosed);

        assert_eq!(reactor.handle_event("o-1").await.unwrap(), ReactorOutcome::AlreadyClosed);
        assert_eq!(dispatcher.calls(), vec![DispatchCall::Assign("o-1".into())]);
    }
}
