//! Transport port.

use super::envelope::{RpcRequest, RpcResponse};
use crate::error::ClientError;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// Stream of push envelopes for one subscription.
///
/// An `Err` item is a channel-level failure (reset, lag). The stream may keep
/// yielding after it; it ends when the subscription is closed.
pub type PushStream = Pin<Box<dyn Stream<Item = Result<RpcResponse, ClientError>> + Send>>;

/// Carrier for named operations against the remote link store.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Perform one query or mutation round-trip.
    async fn execute(&self, request: RpcRequest) -> Result<RpcResponse, ClientError>;

    /// Open a subscription.
    ///
    /// Resolves once the remote side has accepted the subscription; pushes
    /// emitted after that point are delivered on the returned stream.
    async fn subscribe(&self, request: RpcRequest) -> Result<PushStream, ClientError>;
}
