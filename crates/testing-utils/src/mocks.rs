//! Scripted collaborators for dispatcher and API tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dispatch_core::{
    models::{Delivery, OrderSummary},
    traits::{Assignment, DeliveryDispatcher, OrderGateway, RetryRecorder},
    Clock, DispatchError, DispatchResult,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::builders::{CourierBuilder, DeliveryBuilder};

/// Canned upstream reply
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayReply {
    Status(String),
    NotFound,
    Transient,
    Rejected,
    Cancelled,
}

impl GatewayReply {
    fn into_result(self, order_id: &str) -> DispatchResult<String> {
        match self {
            GatewayReply::Status(status) => Ok(status),
            GatewayReply::NotFound => Err(DispatchError::OrderNotFound {
                order_id: order_id.to_string(),
            }),
            GatewayReply::Transient => Err(DispatchError::TransientNetwork("scripted".into())),
            GatewayReply::Rejected => Err(DispatchError::UpstreamRejected("scripted".into())),
            GatewayReply::Cancelled => Err(DispatchError::Cancelled),
        }
    }
}

/// Order gateway answering from a script.
///
/// Each order id has a queue of replies; the last one repeats. Unknown
/// orders answer `OrderNotFound`. The feed returns scripted batches, then
/// empty lists.
#[derive(Debug, Default)]
pub struct ScriptedOrderGateway {
    statuses: Mutex<HashMap<String, VecDeque<GatewayReply>>>,
    feed: Mutex<VecDeque<Result<Vec<OrderSummary>, String>>>,
    status_calls: Mutex<Vec<String>>,
    feed_calls: Mutex<Vec<DateTime<Utc>>>,
}

impl ScriptedOrderGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(self, order_id: &str, status: &str) -> Self {
        self.script(order_id, GatewayReply::Status(status.to_string()));
        self
    }

    pub fn script(&self, order_id: &str, reply: GatewayReply) {
        self.statuses
            .lock()
            .unwrap()
            .entry(order_id.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn push_orders(&self, orders: Vec<OrderSummary>) {
        self.feed.lock().unwrap().push_back(Ok(orders));
    }

    pub fn push_feed_error(&self, message: &str) {
        self.feed.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn status_calls(&self) -> Vec<String> {
        self.status_calls.lock().unwrap().clone()
    }

    /// Cursors passed to `fetch_orders`, in call order.
    pub fn feed_calls(&self) -> Vec<DateTime<Utc>> {
        self.feed_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderGateway for ScriptedOrderGateway {
    async fn fetch_status(&self, order_id: &str) -> DispatchResult<String> {
        self.status_calls.lock().unwrap().push(order_id.to_string());

        let reply = {
            let mut statuses = self.statuses.lock().unwrap();
            match statuses.get_mut(order_id) {
                Some(replies) if replies.len() > 1 => replies.pop_front(),
                Some(replies) => replies.front().cloned(),
                None => None,
            }
        };

        reply
            .unwrap_or(GatewayReply::NotFound)
            .into_result(order_id)
    }

    async fn fetch_orders(&self, since: DateTime<Utc>) -> DispatchResult<Vec<OrderSummary>> {
        self.feed_calls.lock().unwrap().push(since);
        match self.feed.lock().unwrap().pop_front() {
            Some(Ok(orders)) => Ok(orders),
            Some(Err(message)) => Err(DispatchError::TransientNetwork(message)),
            None => Ok(Vec::new()),
        }
    }
}

/// One call observed by `RecordingDispatcher`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchCall {
    Assign(String),
    Unassign(String),
    Complete(String),
}

/// Failure a `RecordingDispatcher` operation is scripted to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedFailure {
    DeliveryNotFound,
    NoCourierAvailable,
    AlreadyClosed,
    Internal,
}

impl ScriptedFailure {
    fn into_error(self, order_id: &str) -> DispatchError {
        match self {
            ScriptedFailure::DeliveryNotFound => DispatchError::delivery_not_found(order_id),
            ScriptedFailure::NoCourierAvailable => DispatchError::NoCourierAvailable,
            ScriptedFailure::AlreadyClosed => DispatchError::DeliveryAlreadyClosed {
                order_id: order_id.to_string(),
            },
            ScriptedFailure::Internal => DispatchError::Internal("scripted".into()),
        }
    }
}

/// Dispatcher that records calls and answers with canned rows
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<DispatchCall>>,
    failures: Mutex<HashMap<&'static str, ScriptedFailure>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_assign(&self, failure: ScriptedFailure) {
        self.failures.lock().unwrap().insert("assign", failure);
    }

    pub fn fail_unassign(&self, failure: ScriptedFailure) {
        self.failures.lock().unwrap().insert("unassign", failure);
    }

    pub fn fail_complete(&self, failure: ScriptedFailure) {
        self.failures.lock().unwrap().insert("complete", failure);
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, op: &'static str, order_id: &str) -> DispatchResult<()> {
        match self.failures.lock().unwrap().get(op) {
            Some(failure) => Err(failure.into_error(order_id)),
            None => Ok(()),
        }
    }

    fn delivery(order_id: &str) -> Delivery {
        DeliveryBuilder::new().with_order(order_id).build()
    }
}

#[async_trait]
impl DeliveryDispatcher for RecordingDispatcher {
    async fn assign(&self, order_id: &str) -> DispatchResult<Assignment> {
        self.calls
            .lock()
            .unwrap()
            .push(DispatchCall::Assign(order_id.to_string()));
        self.check("assign", order_id)?;
        Ok(Assignment {
            delivery: Self::delivery(order_id),
            courier: CourierBuilder::new().busy().build(),
        })
    }

    async fn unassign(&self, order_id: &str) -> DispatchResult<Delivery> {
        self.calls
            .lock()
            .unwrap()
            .push(DispatchCall::Unassign(order_id.to_string()));
        self.check("unassign", order_id)?;
        Ok(Self::delivery(order_id))
    }

    async fn complete(&self, order_id: &str) -> DispatchResult<Delivery> {
        self.calls
            .lock()
            .unwrap()
            .push(DispatchCall::Complete(order_id.to_string()));
        self.check("complete", order_id)?;
        Ok(DeliveryBuilder::new()
            .with_order(order_id)
            .completed_at(Utc::now())
            .build())
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap() = at;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Retry recorder that remembers every notification
#[derive(Debug, Default)]
pub struct CountingRetryRecorder {
    count: AtomicU32,
    attempts: Mutex<Vec<(String, u32)>>,
}

impl CountingRetryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> Vec<(String, u32)> {
        self.attempts.lock().unwrap().clone()
    }
}

impl RetryRecorder for CountingRetryRecorder {
    fn record_retry(&self, operation: &str, attempt: u32, _error: &DispatchError) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.attempts
            .lock()
            .unwrap()
            .push((operation.to_string(), attempt));
    }
}
