//! Error types for the perspective client.
//!
//! Not-found outcomes are never errors: they surface as `None` / `false`
//! return values. Everything in here reaches the caller of the operation
//! that triggered it, except push-stream errors, which the subscription
//! pumps log and swallow.

use thiserror::Error;

/// Error returned by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not complete the round-trip (network failure,
    /// closed channel, lagging push stream).
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The remote store answered with one or more errors, or with no data.
    #[error("Remote error: {message}")]
    RemoteError {
        /// All messages joined with `"; "`.
        message: String,
        /// The individual messages as reported by the store.
        errors: Vec<String>,
    },

    /// A payload did not have the expected shape.
    #[error("Decode error: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error(transparent)]
    UnknownSharingType(#[from] UnknownSharingType),

    /// The client behind a proxy or subscription has been dropped.
    #[error("Perspective client has been dropped")]
    Disconnected,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ClientError {
    /// Build a remote error from the store's error list.
    pub fn remote(errors: Vec<String>) -> Self {
        let message = if errors.is_empty() {
            "Unknown remote error".to_string()
        } else {
            errors.join("; ")
        };
        ClientError::RemoteError { message, errors }
    }

    /// First message reported by the store, if this is a remote error.
    pub fn first_remote_message(&self) -> Option<&str> {
        match self {
            ClientError::RemoteError { errors, .. } => errors.first().map(String::as_str),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(err: config::ConfigError) -> Self {
        ClientError::ConfigError(err.to_string())
    }
}

/// A sharing-type literal that names none of the known policies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown sharing type: {0:?}")]
pub struct UnknownSharingType(pub String);
