//! PerspectiveProxy: one perspective, bound to the client that produced it.

use crate::client::{ClientInner, LinkSubscription, PerspectiveClient};
use crate::error::ClientError;
use crate::links::{Link, LinkExpression, LinkQuery};
use crate::perspectives::{Neighbourhood, Perspective, PerspectiveHandle};
use crate::types::Address;
use std::sync::Weak;
use tracing::debug;

/// A perspective handle plus a non-owning reference to its client.
///
/// Accessors read the handle snapshot taken when the proxy was created; they
/// do not refresh. Every other method is one or more client calls with this
/// perspective's uuid filled in, and fails with
/// [`ClientError::Disconnected`] once the client has been dropped.
#[derive(Clone)]
pub struct PerspectiveProxy {
    handle: PerspectiveHandle,
    client: Weak<ClientInner>,
}

impl PerspectiveProxy {
    pub(crate) fn new(handle: PerspectiveHandle, client: &PerspectiveClient) -> Self {
        Self {
            handle,
            client: client.downgrade(),
        }
    }

    fn client(&self) -> Result<PerspectiveClient, ClientError> {
        PerspectiveClient::upgrade(&self.client)
    }

    pub fn uuid(&self) -> &str {
        &self.handle.uuid
    }

    pub fn name(&self) -> &str {
        &self.handle.name
    }

    pub fn shared_url(&self) -> Option<&str> {
        self.handle.shared_url.as_deref()
    }

    pub fn neighbourhood(&self) -> Option<&Neighbourhood> {
        self.handle.neighbourhood.as_ref()
    }

    pub fn handle(&self) -> &PerspectiveHandle {
        &self.handle
    }

    pub async fn get(&self, query: &LinkQuery) -> Result<Vec<LinkExpression>, ClientError> {
        self.client()?.query_links(self.uuid(), query).await
    }

    pub async fn snapshot(&self) -> Result<Option<Perspective>, ClientError> {
        self.client()?.snapshot_by_uuid(self.uuid()).await
    }

    pub async fn add(&self, link: Link) -> Result<LinkExpression, ClientError> {
        self.client()?.add_link(self.uuid(), link).await
    }

    pub async fn update(
        &self,
        old: &LinkExpression,
        new_link: Link,
    ) -> Result<LinkExpression, ClientError> {
        self.client()?.update_link(self.uuid(), old, new_link).await
    }

    pub async fn remove(&self, link: &LinkExpression) -> Result<bool, ClientError> {
        self.client()?.remove_link(self.uuid(), link).await
    }

    /// Rename the perspective. Returns a proxy over the updated handle; this
    /// proxy keeps the old name.
    pub async fn rename(&self, name: &str) -> Result<PerspectiveProxy, ClientError> {
        self.client()?.update(self.uuid(), name).await
    }

    pub async fn add_link_added_listener<F>(&self, listener: F) -> Result<LinkSubscription, ClientError>
    where
        F: Fn(&LinkExpression) + Send + Sync + 'static,
    {
        self.client()?
            .add_perspective_link_added_listener(self.uuid(), listener)
            .await
    }

    pub async fn add_link_removed_listener<F>(
        &self,
        listener: F,
    ) -> Result<LinkSubscription, ClientError>
    where
        F: Fn(&LinkExpression) + Send + Sync + 'static,
    {
        self.client()?
            .add_perspective_link_removed_listener(self.uuid(), listener)
            .await
    }

    /// Target of the first link matching `query`'s source and predicate.
    ///
    /// Other query fields are ignored.
    pub async fn get_single_target(&self, query: &LinkQuery) -> Result<Option<Address>, ClientError> {
        let narrowed = LinkQuery {
            source: query.source.clone(),
            predicate: query.predicate.clone(),
            ..LinkQuery::default()
        };
        let links = self.get(&narrowed).await?;
        Ok(links.into_iter().next().map(|expr| expr.data.target))
    }

    /// Make `link` the only link from its source with its predicate.
    ///
    /// Removes every existing link sharing source and predicate, then adds
    /// `link`. Not atomic: a concurrent writer can interleave.
    pub async fn set_single_target(&self, link: Link) -> Result<LinkExpression, ClientError> {
        let client = self.client()?;
        let mut query = LinkQuery::all().source(link.source.clone());
        query.predicate = link.predicate.clone();

        let existing = client.query_links(self.uuid(), &query).await?;
        let mut replaced = 0usize;
        for expr in existing
            .iter()
            .filter(|expr| expr.data.predicate == link.predicate)
        {
            if client.remove_link(self.uuid(), expr).await? {
                replaced += 1;
            }
        }
        debug!(perspective = %self.uuid(), replaced, "Single target set");
        client.add_link(self.uuid(), link).await
    }
}

impl std::fmt::Debug for PerspectiveProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerspectiveProxy")
            .field("handle", &self.handle)
            .field("connected", &(self.client.strong_count() > 0))
            .finish()
    }
}
