//! Perspective Client: typed access to shared link-graph perspectives
//!
//! A perspective is a named, agent-owned set of directed, optionally labeled
//! links between resource addresses. This crate is the client side of the
//! store that holds them: it lists, creates, renames and removes
//! perspectives, reads links through [`LinkQuery`] filters, writes links, and
//! turns the store's push subscriptions into ordered listener callbacks.
//!
//! The wire is abstracted behind [`RpcTransport`];
//! [`MemoryTransport`] is a complete in-process store for embedding and tests.

pub mod client;
pub mod config;
pub mod error;
pub mod links;
pub mod logging;
pub mod perspectives;
pub mod proxy;
pub mod rpc;
pub mod types;

pub use client::{LinkEventKind, LinkSubscription, ListenerToken, PerspectiveClient};
pub use config::{ClientConfig, ConfigLoader};
pub use error::ClientError;
pub use links::{Link, LinkExpression, LinkQuery};
pub use perspectives::{Perspective, PerspectiveHandle, SharedPerspective, SharingType};
pub use proxy::PerspectiveProxy;
pub use rpc::{MemoryTransport, RpcTransport};
