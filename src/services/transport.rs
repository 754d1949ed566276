//! Boundary to the session/transport collaborator.

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Opaque acknowledgement of an open subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    /// Transport-assigned subscription id.
    pub id: u64,
    /// Channel the subscription listens on.
    pub channel: String,
}

/// Sink the transport forwards every pushed payload into, in delivery order.
pub type PushSink = mpsc::UnboundedSender<Value>;

/// Abstraction over the RPC + pub/sub session the client talks to.
///
/// Delivery on a subscription is ordered and at-least-once per game.
pub trait Transport: Send + Sync {
    /// Invoke `procedure` with keyword arguments and resolve with its result.
    fn call(
        &self,
        procedure: String,
        kwargs: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Value, TransportError>>;

    /// Start forwarding payloads published on `channel` into `sink`.
    fn subscribe(
        &self,
        channel: String,
        sink: PushSink,
    ) -> BoxFuture<'static, Result<SubscriptionHandle, TransportError>>;

    /// Stop the subscription behind `handle`.
    fn unsubscribe(&self, handle: SubscriptionHandle) -> BoxFuture<'static, Result<(), TransportError>>;
}
