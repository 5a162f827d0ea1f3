//! ConfigLoader: layers defaults, an optional file, and the environment.

use super::ClientConfig;
use crate::error::ClientError;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use std::path::Path;

/// Environment prefix; nested keys use `__`, e.g.
/// `PERSPECTIVE__SUBSCRIPTIONS__RESUBSCRIBE=false`.
pub const ENV_PREFIX: &str = "PERSPECTIVE";

/// Configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration.
    /// Precedence: defaults (lowest) -> file, if given -> environment (highest).
    pub fn load(path: Option<&Path>) -> Result<ClientConfig, ClientError> {
        let mut builder = Self::builder_with_defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load configuration from a specific file with environment overlay.
    pub fn load_from_file(path: &Path) -> Result<ClientConfig, ClientError> {
        Self::load(Some(path))
    }

    /// Defaults plus environment only.
    pub fn from_env() -> Result<ClientConfig, ClientError> {
        Self::load(None)
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ClientError> {
        let defaults = Config::try_from(&ClientConfig::default())?;
        Ok(Config::builder().add_source(defaults))
    }
}
