//! PerspectiveHandle: identity and metadata of a perspective as known to the store.

use crate::links::LinkExpression;
use crate::types::{Address, PerspectiveUuid};
use serde::{Deserialize, Serialize};

/// A materialized link set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perspective {
    #[serde(default)]
    pub links: Vec<LinkExpression>,
}

impl Perspective {
    pub fn new(links: Vec<LinkExpression>) -> Self {
        Self { links }
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// Shared-network binding of a published perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Neighbourhood {
    pub link_language: Address,
    #[serde(default)]
    pub meta: Perspective,
}

/// Snapshot of a perspective's identity and metadata.
///
/// `uuid` is stable, `name` is mutable. A handle is never refreshed in
/// place; re-query or listen for updates to observe changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveHandle {
    pub uuid: PerspectiveUuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighbourhood: Option<Neighbourhood>,
}

impl PerspectiveHandle {
    pub fn new(uuid: impl Into<PerspectiveUuid>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            shared_url: None,
            neighbourhood: None,
        }
    }

    /// Whether the perspective has been published to a neighbourhood.
    pub fn is_shared(&self) -> bool {
        self.shared_url.is_some()
    }
}
