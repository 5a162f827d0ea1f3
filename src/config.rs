//! Client configuration.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. See [`ConfigLoader`] for source precedence.

mod loader;

pub use loader::ConfigLoader;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub subscriptions: SubscriptionConfig,
    #[serde(default)]
    pub listeners: ListenerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Behaviour of push subscriptions once their stream ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Re-open a subscription whose stream ended (default: true)
    #[serde(default = "default_true")]
    pub resubscribe: bool,

    /// Delay before each re-open attempt in milliseconds (default: 1000)
    #[serde(default = "default_resubscribe_delay_ms")]
    pub resubscribe_delay_ms: u64,

    /// Consecutive failed re-open attempts before giving up; None retries forever
    #[serde(default = "default_max_resubscribe_attempts")]
    pub max_resubscribe_attempts: Option<u32>,
}

fn default_true() -> bool {
    true
}

fn default_resubscribe_delay_ms() -> u64 {
    1000
}

fn default_max_resubscribe_attempts() -> Option<u32> {
    Some(5)
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            resubscribe: default_true(),
            resubscribe_delay_ms: default_resubscribe_delay_ms(),
            max_resubscribe_attempts: default_max_resubscribe_attempts(),
        }
    }
}

/// Listener dispatch policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Catch and log listener panics so the remaining listeners still run
    /// (default: true)
    #[serde(default = "default_true")]
    pub isolate_panics: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            isolate_panics: default_true(),
        }
    }
}
