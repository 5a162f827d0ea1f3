//! Core identifier types shared across the client.

/// Stable identity of a perspective, assigned by the store.
pub type PerspectiveUuid = String;

/// Opaque resource address (URI) used as link source or target.
pub type Address = String;

/// Decentralized identifier naming an agent.
pub type Did = String;
