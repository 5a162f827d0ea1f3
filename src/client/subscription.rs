//! Push subscription pumps and per-perspective link subscriptions.

use super::listeners;
use crate::config::SubscriptionConfig;
use crate::error::ClientError;
use crate::links::LinkExpression;
use crate::rpc::envelope::{take_field, unwrap_response};
use crate::rpc::{PushStream, RpcRequest, RpcTransport};
use crate::types::PerspectiveUuid;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{error, info, warn};

/// An opened subscription and what is needed to re-open it.
pub(crate) struct PushSource {
    pub(crate) transport: Arc<dyn RpcTransport>,
    pub(crate) request: RpcRequest,
    pub(crate) stream: PushStream,
}

impl PushSource {
    /// Open `request` on `transport`.
    pub(crate) async fn open(
        transport: Arc<dyn RpcTransport>,
        request: RpcRequest,
    ) -> Result<Self, ClientError> {
        let stream = transport.subscribe(request.clone()).await?;
        Ok(Self {
            transport,
            request,
            stream,
        })
    }
}

/// Read the source's stream until it ends, handing each decoded push to `deliver`.
///
/// Channel errors and malformed pushes are logged and skipped. When the
/// stream ends and `config.resubscribe` is set, the subscription is re-opened
/// after the configured delay; events pushed while it was down are lost.
pub(crate) async fn run_pump<D, F>(source: PushSource, config: SubscriptionConfig, deliver: F)
where
    D: DeserializeOwned,
    F: Fn(D),
{
    let PushSource {
        transport,
        request,
        mut stream,
    } = source;
    let field = request.operation_name.clone();
    loop {
        while let Some(item) = stream.next().await {
            match item
                .and_then(unwrap_response)
                .and_then(|data| take_field::<D>(data, &field))
            {
                Ok(event) => deliver(event),
                Err(e) => warn!(subscription = %field, error = %e, "Push receive failed"),
            }
        }

        if !config.resubscribe {
            info!(subscription = %field, "Subscription stream ended");
            return;
        }
        match reopen(transport.as_ref(), &request, &config).await {
            Some(reopened) => stream = reopened,
            None => return,
        }
    }
}

async fn reopen(
    transport: &dyn RpcTransport,
    request: &RpcRequest,
    config: &SubscriptionConfig,
) -> Option<PushStream> {
    let field = &request.operation_name;
    let mut failures = 0u32;
    loop {
        if config
            .max_resubscribe_attempts
            .is_some_and(|max| failures >= max)
        {
            error!(subscription = %field, failures, "Giving up on subscription");
            return None;
        }
        tokio::time::sleep(Duration::from_millis(config.resubscribe_delay_ms)).await;
        match transport.subscribe(request.clone()).await {
            Ok(stream) => {
                info!(subscription = %field, "Subscription re-opened");
                return Some(stream);
            }
            Err(e) => {
                failures += 1;
                warn!(subscription = %field, error = %e, failures, "Re-subscribe failed");
            }
        }
    }
}

/// Which link event a subscription reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEventKind {
    Added,
    Removed,
}

/// Sends `false` on the active flag when the pump task finishes or is aborted.
struct ActiveGuard(watch::Sender<bool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.send_replace(false);
    }
}

/// Handle for one perspective-scoped link subscription.
///
/// The subscription is already active when the handle is returned. Dropping
/// the handle leaves the subscription running; use [`cancel`](Self::cancel)
/// to stop it. It stops in any case once the last clone of the client that
/// opened it is dropped.
pub struct LinkSubscription {
    uuid: PerspectiveUuid,
    kind: LinkEventKind,
    active: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl LinkSubscription {
    pub(crate) fn spawn<F>(
        source: PushSource,
        config: SubscriptionConfig,
        isolate_panics: bool,
        kind: LinkEventKind,
        uuid: PerspectiveUuid,
        callback: F,
    ) -> Self
    where
        F: Fn(&LinkExpression) + Send + Sync + 'static,
    {
        let (active_tx, active) = watch::channel(true);
        // Built outside the task so an abort before the first poll still clears the flag.
        let guard = ActiveGuard(active_tx);
        let name = source.request.operation_name.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            run_pump(source, config, |link: LinkExpression| {
                listeners::invoke(&name, isolate_panics, || callback(&link));
            })
            .await;
        });
        Self {
            uuid,
            kind,
            active,
            task,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn kind(&self) -> LinkEventKind {
        self.kind
    }

    /// Whether pushes are still being received.
    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Resolve once the subscription has stopped.
    pub async fn closed(&self) {
        let mut active = self.active.clone();
        while *active.borrow_and_update() {
            if active.changed().await.is_err() {
                break;
            }
        }
    }

    /// Stop the subscription. The active flag clears once the task has stopped.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub(crate) fn abort_handle(&self) -> AbortHandle {
        self.task.abort_handle()
    }
}

impl std::fmt::Debug for LinkSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSubscription")
            .field("uuid", &self.uuid)
            .field("kind", &self.kind)
            .field("active", &self.is_active())
            .finish()
    }
}
