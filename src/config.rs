//! Configuration management for the presence relay
//!
//! Built-in defaults are layered under an optional `config.toml` and
//! `RELAY_`-prefixed environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

use crate::error::RelayError;

/// Environment variable prefix, e.g. `RELAY_PORT=9000`
const ENV_PREFIX: &str = "RELAY";

/// Config file locations tried in order (extension resolved by the `config` crate)
const CONFIG_PATHS: [&str; 2] = [
    "presence-relay/config", // container layout: /app/presence-relay/config.toml
    "config",                // local development: ./config.toml
];

/// What the registry does when an identity is claimed by a second connection
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Refuse the newcomer; the current holder keeps the identity.
    #[default]
    Reject,
    /// Close the current holder and hand the identity to the newcomer.
    Evict,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::Reject => write!(f, "reject"),
            CollisionPolicy::Evict => write!(f, "evict"),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address the listener binds to
    pub bind_address: String,

    /// Listen port, `0` for an ephemeral port
    pub port: u16,

    /// Maximum concurrent connections, registered or not
    pub max_clients: usize,

    // ═══ LIMITS ═══
    /// Maximum length in bytes of one inbound frame (one line)
    pub max_frame_length: usize,

    /// Maximum identity length in characters
    pub max_identity_length: usize,

    /// Maximum message body length in bytes
    pub max_body_length: usize,

    /// Events queued per connection before delivery to it fails
    pub outbound_buffer: usize,

    // ═══ REGISTRY ═══
    pub collision_policy: CollisionPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 3000,
            max_clients: 256,
            max_frame_length: 8192,
            max_identity_length: 64,
            max_body_length: 4096,
            outbound_buffer: 64,
            collision_policy: CollisionPolicy::Reject,
        }
    }
}

impl ServerConfig {
    /// Load configuration from defaults, config.toml and environment overrides
    pub fn load() -> Result<Self, RelayError> {
        let defaults = ServerConfig::default();

        let mut builder = Config::builder()
            .set_default("bind_address", defaults.bind_address.clone())?
            .set_default("port", i64::from(defaults.port))?
            .set_default("max_clients", defaults.max_clients as i64)?
            .set_default("max_frame_length", defaults.max_frame_length as i64)?
            .set_default("max_identity_length", defaults.max_identity_length as i64)?
            .set_default("max_body_length", defaults.max_body_length as i64)?
            .set_default("outbound_buffer", defaults.outbound_buffer as i64)?
            .set_default("collision_policy", defaults.collision_policy.to_string())?;

        for path in CONFIG_PATHS {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "bind_address cannot be empty".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.max_identity_length == 0 {
            return Err(config::ConfigError::Message(
                "max_identity_length must be greater than 0".into(),
            ));
        }

        if self.outbound_buffer == 0 {
            return Err(config::ConfigError::Message(
                "outbound_buffer must be greater than 0".into(),
            ));
        }

        // A send frame must be able to carry a full-size body plus its envelope
        if self.max_frame_length <= self.max_body_length {
            return Err(config::ConfigError::Message(
                "max_frame_length must be larger than max_body_length".into(),
            ));
        }

        Ok(())
    }

    /// Get bind address and port as a listen address
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
