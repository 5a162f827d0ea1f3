//! PerspectiveClient
//!
//! Single point of contact with the remote link store. Every operation is
//! one round-trip through the transport; results are unwrapped through
//! [`unwrap_response`](crate::rpc::unwrap_response). The client also owns the
//! perspective-added, perspective-updated and perspective-removed
//! subscriptions, opened at connect time and pumped into listener
//! registries for as long as the client lives.

mod listeners;
mod subscription;

pub use listeners::ListenerToken;
pub use subscription::{LinkEventKind, LinkSubscription};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::links::{Link, LinkExpression, LinkQuery};
use crate::perspectives::{Perspective, PerspectiveHandle};
use crate::proxy::PerspectiveProxy;
use crate::rpc::envelope::take_field;
use crate::rpc::{documents, unwrap_response, RpcRequest, RpcTransport};
use listeners::ListenerRegistry;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Weak};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info};

pub(crate) struct ClientInner {
    transport: Arc<dyn RpcTransport>,
    config: ClientConfig,
    added: Arc<ListenerRegistry<PerspectiveHandle>>,
    updated: Arc<ListenerRegistry<PerspectiveHandle>>,
    removed: Arc<ListenerRegistry<str>>,
    pumps: Vec<JoinHandle<()>>,
    link_tasks: Mutex<Vec<AbortHandle>>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
        for task in self.link_tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Client for perspective and link operations.
///
/// Cheap to clone; clones share the transport, listeners and subscriptions.
/// Every subscription, including per-perspective link subscriptions, stops
/// when the last clone is dropped.
#[derive(Clone)]
pub struct PerspectiveClient {
    inner: Arc<ClientInner>,
}

impl PerspectiveClient {
    /// Connect with default configuration. Must run inside a tokio runtime.
    pub async fn connect(transport: Arc<dyn RpcTransport>) -> Result<Self, ClientError> {
        Self::connect_with_config(transport, ClientConfig::default()).await
    }

    /// Connect and open the three perspective subscriptions.
    ///
    /// Returns once all three are active.
    pub async fn connect_with_config(
        transport: Arc<dyn RpcTransport>,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let isolate = config.listeners.isolate_panics;
        let added = Arc::new(ListenerRegistry::new(documents::PERSPECTIVE_ADDED, isolate));
        let updated = Arc::new(ListenerRegistry::new(documents::PERSPECTIVE_UPDATED, isolate));
        let removed = Arc::new(ListenerRegistry::new(documents::PERSPECTIVE_REMOVED, isolate));

        let added_source =
            subscription::PushSource::open(Arc::clone(&transport), documents::perspective_added())
                .await?;
        let updated_source =
            subscription::PushSource::open(Arc::clone(&transport), documents::perspective_updated())
                .await?;
        let removed_source =
            subscription::PushSource::open(Arc::clone(&transport), documents::perspective_removed())
                .await?;

        let pumps = vec![
            tokio::spawn(subscription::run_pump(
                added_source,
                config.subscriptions.clone(),
                {
                    let registry = Arc::clone(&added);
                    move |handle: PerspectiveHandle| {
                        registry.dispatch(&handle);
                    }
                },
            )),
            tokio::spawn(subscription::run_pump(
                updated_source,
                config.subscriptions.clone(),
                {
                    let registry = Arc::clone(&updated);
                    move |handle: PerspectiveHandle| {
                        registry.dispatch(&handle);
                    }
                },
            )),
            tokio::spawn(subscription::run_pump(
                removed_source,
                config.subscriptions.clone(),
                {
                    let registry = Arc::clone(&removed);
                    move |uuid: String| {
                        registry.dispatch(uuid.as_str());
                    }
                },
            )),
        ];
        info!("Perspective client connected; perspective subscriptions active");

        Ok(Self {
            inner: Arc::new(ClientInner {
                transport,
                config,
                added,
                updated,
                removed,
                pumps,
                link_tasks: Mutex::new(Vec::new()),
            }),
        })
    }

    pub(crate) fn downgrade(&self) -> Weak<ClientInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(inner: &Weak<ClientInner>) -> Result<Self, ClientError> {
        inner
            .upgrade()
            .map(|inner| Self { inner })
            .ok_or(ClientError::Disconnected)
    }

    fn proxy(&self, handle: PerspectiveHandle) -> PerspectiveProxy {
        PerspectiveProxy::new(handle, self)
    }

    async fn call<T: DeserializeOwned>(&self, request: RpcRequest) -> Result<T, ClientError> {
        let field = request.operation_name.clone();
        debug!(operation = %field, kind = ?request.kind, "Perspective request");
        let response = self.inner.transport.execute(request).await?;
        take_field(unwrap_response(response)?, &field)
    }

    /// Every perspective the local agent holds.
    pub async fn all(&self) -> Result<Vec<PerspectiveProxy>, ClientError> {
        let handles: Vec<PerspectiveHandle> = self.call(documents::perspectives()).await?;
        Ok(handles.into_iter().map(|h| self.proxy(h)).collect())
    }

    /// The perspective with `uuid`, or `None` if the store has none.
    pub async fn by_uuid(&self, uuid: &str) -> Result<Option<PerspectiveProxy>, ClientError> {
        let handle: Option<PerspectiveHandle> = self.call(documents::perspective(uuid)).await?;
        Ok(handle.map(|h| self.proxy(h)))
    }

    /// Full current link set of a perspective, or `None` if absent.
    pub async fn snapshot_by_uuid(&self, uuid: &str) -> Result<Option<Perspective>, ClientError> {
        self.call(documents::perspective_snapshot(uuid)).await
    }

    /// Links of a perspective matching `query`, filtered by the store.
    pub async fn query_links(
        &self,
        uuid: &str,
        query: &LinkQuery,
    ) -> Result<Vec<LinkExpression>, ClientError> {
        self.call(documents::perspective_query_links(uuid, query)?)
            .await
    }

    /// Create an empty perspective. Names need not be unique.
    pub async fn add(&self, name: &str) -> Result<PerspectiveProxy, ClientError> {
        let handle: PerspectiveHandle = self.call(documents::perspective_add(name)).await?;
        Ok(self.proxy(handle))
    }

    /// Rename a perspective. Fails if `uuid` is unknown to the store.
    pub async fn update(&self, uuid: &str, name: &str) -> Result<PerspectiveProxy, ClientError> {
        let handle: PerspectiveHandle =
            self.call(documents::perspective_update(uuid, name)).await?;
        Ok(self.proxy(handle))
    }

    /// Delete a perspective and its links. `false` if there was nothing to remove.
    pub async fn remove(&self, uuid: &str) -> Result<bool, ClientError> {
        let removed: Option<bool> = self.call(documents::perspective_remove(uuid)).await?;
        Ok(removed.unwrap_or(false))
    }

    /// Add a link; the store stamps author, timestamp and proof.
    pub async fn add_link(&self, uuid: &str, link: Link) -> Result<LinkExpression, ClientError> {
        self.call(documents::perspective_add_link(uuid, &link)?)
            .await
    }

    /// Replace exactly `old` with a newly stamped expression for `new_link`.
    ///
    /// Fails if `old` no longer matches a stored expression, e.g. after an
    /// intervening remove or update.
    pub async fn update_link(
        &self,
        uuid: &str,
        old: &LinkExpression,
        new_link: Link,
    ) -> Result<LinkExpression, ClientError> {
        self.call(documents::perspective_update_link(
            uuid,
            &old.to_input(),
            &new_link,
        )?)
        .await
    }

    /// Remove exactly `link`. `false` if it matched nothing.
    pub async fn remove_link(&self, uuid: &str, link: &LinkExpression) -> Result<bool, ClientError> {
        let removed: Option<bool> = self
            .call(documents::perspective_remove_link(uuid, &link.to_input())?)
            .await?;
        Ok(removed.unwrap_or(false))
    }

    pub fn add_perspective_added_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(&PerspectiveHandle) + Send + Sync + 'static,
    {
        self.inner.added.register(Arc::new(listener))
    }

    pub fn add_perspective_updated_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(&PerspectiveHandle) + Send + Sync + 'static,
    {
        self.inner.updated.register(Arc::new(listener))
    }

    /// The listener receives the removed perspective's uuid.
    pub fn add_perspective_removed_listener<F>(&self, listener: F) -> ListenerToken
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.removed.register(Arc::new(listener))
    }

    pub fn remove_perspective_added_listener(&self, token: ListenerToken) -> bool {
        self.inner.added.unregister(token)
    }

    pub fn remove_perspective_updated_listener(&self, token: ListenerToken) -> bool {
        self.inner.updated.unregister(token)
    }

    pub fn remove_perspective_removed_listener(&self, token: ListenerToken) -> bool {
        self.inner.removed.unregister(token)
    }

    /// Subscribe to links added to one perspective.
    ///
    /// Opens a dedicated subscription; it is active when this returns.
    pub async fn add_perspective_link_added_listener<F>(
        &self,
        uuid: &str,
        listener: F,
    ) -> Result<LinkSubscription, ClientError>
    where
        F: Fn(&LinkExpression) + Send + Sync + 'static,
    {
        self.link_subscription(LinkEventKind::Added, uuid, listener)
            .await
    }

    /// Subscribe to links removed from one perspective.
    pub async fn add_perspective_link_removed_listener<F>(
        &self,
        uuid: &str,
        listener: F,
    ) -> Result<LinkSubscription, ClientError>
    where
        F: Fn(&LinkExpression) + Send + Sync + 'static,
    {
        self.link_subscription(LinkEventKind::Removed, uuid, listener)
            .await
    }

    async fn link_subscription<F>(
        &self,
        kind: LinkEventKind,
        uuid: &str,
        listener: F,
    ) -> Result<LinkSubscription, ClientError>
    where
        F: Fn(&LinkExpression) + Send + Sync + 'static,
    {
        let request = match kind {
            LinkEventKind::Added => documents::perspective_link_added(uuid),
            LinkEventKind::Removed => documents::perspective_link_removed(uuid),
        };
        let source = subscription::PushSource::open(Arc::clone(&self.inner.transport), request).await?;
        info!(perspective = %uuid, kind = ?kind, "Link subscription active");
        let link_subscription = LinkSubscription::spawn(
            source,
            self.inner.config.subscriptions.clone(),
            self.inner.config.listeners.isolate_panics,
            kind,
            uuid.to_string(),
            listener,
        );

        let mut tasks = self.inner.link_tasks.lock();
        tasks.retain(|task| !task.is_finished());
        tasks.push(link_subscription.abort_handle());
        Ok(link_subscription)
    }
}

impl std::fmt::Debug for PerspectiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerspectiveClient")
            .field("added_listeners", &self.inner.added.len())
            .field("updated_listeners", &self.inner.updated.len())
            .field("removed_listeners", &self.inner.removed.len())
            .finish()
    }
}
