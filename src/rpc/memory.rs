//! In-process link store speaking the full RPC surface.
//!
//! Holds perspectives and their links in insertion order, stamps new links
//! with the configured agent DID, a strictly increasing timestamp and a
//! placeholder proof (blake3 over the canonical encoding, marked valid), and
//! publishes every mutation to open subscriptions. Nothing is synchronized
//! with other agents.

use super::documents;
use super::envelope::{OperationKind, RpcRequest, RpcResponse};
use super::transport::{PushStream, RpcTransport};
use crate::error::ClientError;
use crate::links::{Link, LinkExpression, LinkExpressionInput, LinkQuery, Proof};
use crate::perspectives::{Perspective, PerspectiveHandle};
use crate::types::{Did, PerspectiveUuid};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

const DEFAULT_AGENT: &str = "did:key:local-agent";
const EVENT_CAPACITY: usize = 256;

struct StoredPerspective {
    handle: PerspectiveHandle,
    links: Vec<LinkExpression>,
}

#[derive(Default)]
struct StoreState {
    perspectives: Vec<StoredPerspective>,
    last_stamp: Option<DateTime<Utc>>,
}

impl StoreState {
    fn get(&self, uuid: &str) -> Option<&StoredPerspective> {
        self.perspectives.iter().find(|p| p.handle.uuid == uuid)
    }

    fn get_mut(&mut self, uuid: &str) -> Result<&mut StoredPerspective, String> {
        self.perspectives
            .iter_mut()
            .find(|p| p.handle.uuid == uuid)
            .ok_or_else(|| format!("Perspective not found: {uuid}"))
    }

    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }
}

#[derive(Debug, Clone)]
enum StoreEvent {
    PerspectiveAdded(PerspectiveHandle),
    PerspectiveUpdated(PerspectiveHandle),
    PerspectiveRemoved(PerspectiveUuid),
    LinkAdded(PerspectiveUuid, LinkExpression),
    LinkRemoved(PerspectiveUuid, LinkExpression),
    ChannelError(String),
}

/// Which store events a subscription forwards.
enum Selector {
    Added,
    Updated,
    Removed,
    LinkAdded(PerspectiveUuid),
    LinkRemoved(PerspectiveUuid),
}

impl Selector {
    fn select(&self, event: &StoreEvent) -> Option<Result<Value, ClientError>> {
        let value = match (self, event) {
            (Selector::Added, StoreEvent::PerspectiveAdded(h))
            | (Selector::Updated, StoreEvent::PerspectiveUpdated(h)) => serde_json::to_value(h),
            (Selector::Removed, StoreEvent::PerspectiveRemoved(uuid)) => {
                Ok(Value::String(uuid.clone()))
            }
            (Selector::LinkAdded(want), StoreEvent::LinkAdded(uuid, link))
            | (Selector::LinkRemoved(want), StoreEvent::LinkRemoved(uuid, link))
                if want == uuid =>
            {
                serde_json::to_value(link)
            }
            _ => return None,
        };
        Some(value.map_err(ClientError::from))
    }
}

/// In-memory implementation of [`RpcTransport`].
pub struct MemoryTransport {
    agent: Did,
    state: Mutex<StoreState>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryTransport {
    /// Create an empty store authoring links as a default local agent.
    pub fn new() -> Self {
        Self::with_agent(DEFAULT_AGENT)
    }

    /// Create an empty store authoring links as `agent`.
    pub fn with_agent(agent: impl Into<Did>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            agent: agent.into(),
            state: Mutex::new(StoreState::default()),
            events,
        }
    }

    /// DID stamped on links added through this store.
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Seed a perspective with existing links, bypassing stamping and pushes.
    pub fn insert_perspective(&self, handle: PerspectiveHandle, links: Vec<LinkExpression>) {
        let mut state = self.state.lock();
        state.perspectives.retain(|p| p.handle.uuid != handle.uuid);
        state.perspectives.push(StoredPerspective { handle, links });
    }

    /// Deliver a channel-level error to every open subscription.
    pub fn inject_push_error(&self, message: impl Into<String>) {
        let _ = self.events.send(StoreEvent::ChannelError(message.into()));
    }

    fn publish(&self, event: StoreEvent) {
        // No open subscriptions is not an error.
        let _ = self.events.send(event);
    }

    fn stamp(&self, state: &mut StoreState, data: Link) -> LinkExpression {
        let timestamp = state
            .next_timestamp()
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        let canonical = format!(
            "{}\n{}\n{}\n{}\n{}",
            self.agent,
            timestamp,
            data.source,
            data.predicate.as_deref().unwrap_or_default(),
            data.target
        );
        let signature = blake3::hash(canonical.as_bytes()).to_hex().to_string();
        LinkExpression {
            author: self.agent.clone(),
            timestamp,
            data,
            proof: Proof {
                signature,
                key: format!("{}#primary", self.agent),
                valid: Some(true),
                invalid: None,
            },
        }
    }

    fn perspectives(&self) -> Result<Value, String> {
        let state = self.state.lock();
        let handles: Vec<&PerspectiveHandle> =
            state.perspectives.iter().map(|p| &p.handle).collect();
        to_value(&handles)
    }

    fn perspective(&self, uuid: &str) -> Result<Value, String> {
        let state = self.state.lock();
        to_value(&state.get(uuid).map(|p| &p.handle))
    }

    fn snapshot(&self, uuid: &str) -> Result<Value, String> {
        let state = self.state.lock();
        let snapshot = state.get(uuid).map(|p| Perspective::new(p.links.clone()));
        to_value(&snapshot)
    }

    fn query_links(&self, uuid: &str, query: &LinkQuery) -> Result<Value, String> {
        let state = self.state.lock();
        let stored = state
            .get(uuid)
            .ok_or_else(|| format!("Perspective not found: {uuid}"))?;
        to_value(&query.apply(&stored.links))
    }

    fn add(&self, name: String) -> Result<Value, String> {
        let handle = PerspectiveHandle::new(uuid::Uuid::new_v4().to_string(), name);
        self.state.lock().perspectives.push(StoredPerspective {
            handle: handle.clone(),
            links: Vec::new(),
        });
        let value = to_value(&handle)?;
        self.publish(StoreEvent::PerspectiveAdded(handle));
        Ok(value)
    }

    fn update(&self, uuid: &str, name: String) -> Result<Value, String> {
        let handle = {
            let mut state = self.state.lock();
            let stored = state.get_mut(uuid)?;
            stored.handle.name = name;
            stored.handle.clone()
        };
        let value = to_value(&handle)?;
        self.publish(StoreEvent::PerspectiveUpdated(handle));
        Ok(value)
    }

    fn remove(&self, uuid: &str) -> Result<Value, String> {
        let removed = {
            let mut state = self.state.lock();
            let before = state.perspectives.len();
            state.perspectives.retain(|p| p.handle.uuid != uuid);
            state.perspectives.len() != before
        };
        if removed {
            self.publish(StoreEvent::PerspectiveRemoved(uuid.to_string()));
        }
        Ok(Value::Bool(removed))
    }

    fn add_link(&self, uuid: &str, link: Link) -> Result<Value, String> {
        let expression = {
            let mut state = self.state.lock();
            state.get_mut(uuid)?;
            let expression = self.stamp(&mut state, link);
            state.get_mut(uuid)?.links.push(expression.clone());
            expression
        };
        let value = to_value(&expression)?;
        self.publish(StoreEvent::LinkAdded(uuid.to_string(), expression));
        Ok(value)
    }

    fn update_link(
        &self,
        uuid: &str,
        old_link: &LinkExpressionInput,
        new_link: Link,
    ) -> Result<Value, String> {
        let (old, new) = {
            let mut state = self.state.lock();
            let index = state
                .get_mut(uuid)?
                .links
                .iter()
                .position(|l| l.is_same_expression(old_link))
                .ok_or_else(|| format!("Link to update not found in perspective {uuid}"))?;
            let new = self.stamp(&mut state, new_link);
            let stored = state.get_mut(uuid)?;
            let old = std::mem::replace(&mut stored.links[index], new.clone());
            (old, new)
        };
        let value = to_value(&new)?;
        self.publish(StoreEvent::LinkRemoved(uuid.to_string(), old));
        self.publish(StoreEvent::LinkAdded(uuid.to_string(), new));
        Ok(value)
    }

    fn remove_link(&self, uuid: &str, link: &LinkExpressionInput) -> Result<Value, String> {
        let removed = {
            let mut state = self.state.lock();
            let stored = state.get_mut(uuid)?;
            stored
                .links
                .iter()
                .position(|l| l.is_same_expression(link))
                .map(|index| stored.links.remove(index))
        };
        match removed {
            Some(expression) => {
                self.publish(StoreEvent::LinkRemoved(uuid.to_string(), expression));
                Ok(Value::Bool(true))
            }
            None => Ok(Value::Bool(false)),
        }
    }

    fn dispatch(&self, request: &RpcRequest) -> Result<Value, String> {
        let var = |name: &str| request.variable::<String>(name).map_err(|e| e.to_string());
        match request.operation_name.as_str() {
            documents::PERSPECTIVES => self.perspectives(),
            documents::PERSPECTIVE => self.perspective(&var("uuid")?),
            documents::PERSPECTIVE_SNAPSHOT => self.snapshot(&var("uuid")?),
            documents::PERSPECTIVE_QUERY_LINKS => {
                let query: LinkQuery = request.variable("query").map_err(|e| e.to_string())?;
                self.query_links(&var("uuid")?, &query)
            }
            documents::PERSPECTIVE_ADD => self.add(var("name")?),
            documents::PERSPECTIVE_UPDATE => self.update(&var("uuid")?, var("name")?),
            documents::PERSPECTIVE_REMOVE => self.remove(&var("uuid")?),
            documents::PERSPECTIVE_ADD_LINK => {
                let link: Link = request.variable("link").map_err(|e| e.to_string())?;
                self.add_link(&var("uuid")?, link)
            }
            documents::PERSPECTIVE_UPDATE_LINK => {
                let old_link: LinkExpressionInput =
                    request.variable("oldLink").map_err(|e| e.to_string())?;
                let new_link: Link = request.variable("newLink").map_err(|e| e.to_string())?;
                self.update_link(&var("uuid")?, &old_link, new_link)
            }
            documents::PERSPECTIVE_REMOVE_LINK => {
                let link: LinkExpressionInput =
                    request.variable("link").map_err(|e| e.to_string())?;
                self.remove_link(&var("uuid")?, &link)
            }
            other => Err(format!("Unknown operation: {other}")),
        }
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

#[async_trait]
impl RpcTransport for MemoryTransport {
    async fn execute(&self, request: RpcRequest) -> Result<RpcResponse, ClientError> {
        debug!(operation = %request.operation_name, kind = ?request.kind, "Memory store request");
        if request.kind == OperationKind::Subscription {
            return Ok(RpcResponse::error(format!(
                "{} is a subscription",
                request.operation_name
            )));
        }
        Ok(match self.dispatch(&request) {
            Ok(value) => RpcResponse::field(&request.operation_name, value),
            Err(message) => RpcResponse::error(message),
        })
    }

    async fn subscribe(&self, request: RpcRequest) -> Result<PushStream, ClientError> {
        let uuid = || request.variable::<String>("uuid");
        let selector = match request.operation_name.as_str() {
            documents::PERSPECTIVE_ADDED => Selector::Added,
            documents::PERSPECTIVE_UPDATED => Selector::Updated,
            documents::PERSPECTIVE_REMOVED => Selector::Removed,
            documents::PERSPECTIVE_LINK_ADDED => Selector::LinkAdded(uuid()?),
            documents::PERSPECTIVE_LINK_REMOVED => Selector::LinkRemoved(uuid()?),
            other => {
                return Err(ClientError::remote(vec![format!(
                    "Unknown subscription: {other}"
                )]))
            }
        };
        debug!(operation = %request.operation_name, "Memory store subscription opened");

        let field = request.operation_name.clone();
        let stream = BroadcastStream::new(self.events.subscribe()).filter_map(move |item| {
            let push = match item {
                Ok(StoreEvent::ChannelError(message)) => {
                    Some(Err(ClientError::TransportError(message)))
                }
                Ok(event) => selector
                    .select(&event)
                    .map(|value| value.map(|v| RpcResponse::field(&field, v))),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => Some(Err(
                    ClientError::TransportError(format!("Subscription lagged by {skipped} events")),
                )),
            };
            futures::future::ready(push)
        });
        Ok(Box::pin(stream))
    }
}
