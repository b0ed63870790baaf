//! Error types
//!
//! Defines domain-specific error types for each module of the relay.

use std::fmt;
use std::io;

/// Input validation errors, raised before any registry state is touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyIdentity,
    IdentityTooLong { max: usize },
    EmptyDestination,
    BodyTooLong { max: usize },
    NotRegistered,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyIdentity => write!(f, "identity must not be empty"),
            ValidationError::IdentityTooLong { max } => {
                write!(f, "identity exceeds {} characters", max)
            }
            ValidationError::EmptyDestination => write!(f, "destination must not be empty"),
            ValidationError::BodyTooLong { max } => {
                write!(f, "message body exceeds {} bytes", max)
            }
            ValidationError::NotRegistered => write!(f, "register before sending"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Registry module errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    Invalid(ValidationError),
    IdentityTaken(String),
    AlreadyRegistered(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Invalid(e) => write!(f, "{}", e),
            RegistryError::IdentityTaken(id) => write!(f, "identity already taken: {}", id),
            RegistryError::AlreadyRegistered(id) => {
                write!(f, "connection already registered as {}", id)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<ValidationError> for RegistryError {
    fn from(error: ValidationError) -> Self {
        RegistryError::Invalid(error)
    }
}

/// Failure to hand an event to one connection's outbound queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection's writer is gone
    Closed,
    /// The connection is not draining its queue
    Full,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Closed => write!(f, "connection closed"),
            DeliveryError::Full => write!(f, "outbound queue full"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Router module errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    Invalid(ValidationError),
    Unreachable(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Invalid(e) => write!(f, "{}", e),
            RouteError::Unreachable(_) => write!(f, "recipient unreachable"),
        }
    }
}

impl std::error::Error for RouteError {}

impl From<ValidationError> for RouteError {
    fn from(error: ValidationError) -> Self {
        RouteError::Invalid(error)
    }
}

/// Wire protocol errors
#[derive(Debug)]
pub enum ProtocolError {
    FrameTooLong { max: usize },
    InvalidUtf8,
    Malformed(serde_json::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::FrameTooLong { max } => write!(f, "frame exceeds {} bytes", max),
            ProtocolError::InvalidUtf8 => write!(f, "frame is not valid UTF-8"),
            ProtocolError::Malformed(e) => write!(f, "malformed frame: {}", e),
            ProtocolError::Encode(e) => write!(f, "failed to encode event: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// General relay error that encompasses all error types
#[derive(Debug)]
pub enum RelayError {
    Registry(RegistryError),
    Route(RouteError),
    Protocol(ProtocolError),
    Config(config::ConfigError),
    IoError(io::Error),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Registry(e) => write!(f, "Registry error: {}", e),
            RelayError::Route(e) => write!(f, "Routing error: {}", e),
            RelayError::Protocol(e) => write!(f, "Protocol error: {}", e),
            RelayError::Config(e) => write!(f, "Configuration error: {}", e),
            RelayError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<RegistryError> for RelayError {
    fn from(error: RegistryError) -> Self {
        RelayError::Registry(error)
    }
}

impl From<RouteError> for RelayError {
    fn from(error: RouteError) -> Self {
        RelayError::Route(error)
    }
}

impl From<ProtocolError> for RelayError {
    fn from(error: ProtocolError) -> Self {
        RelayError::Protocol(error)
    }
}

impl From<config::ConfigError> for RelayError {
    fn from(error: config::ConfigError) -> Self {
        RelayError::Config(error)
    }
}

impl From<io::Error> for RelayError {
    fn from(error: io::Error) -> Self {
        RelayError::IoError(error)
    }
}
