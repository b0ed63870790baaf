//! Module `identity`
//!
//! The caller-chosen name a registered connection is routed by.

use std::borrow::Borrow;
use std::fmt;

use crate::error::ValidationError;

/// A non-empty, trimmed identity string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identity(String);

impl Identity {
    /// Validates a requested identity for registration.
    ///
    /// Surrounding whitespace is dropped; what remains must be non-empty and
    /// at most `max_len` characters.
    pub fn parse(raw: &str, max_len: usize) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyIdentity);
        }
        if trimmed.chars().count() > max_len {
            return Err(ValidationError::IdentityTooLong { max: max_len });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Validates the destination of a send. Only emptiness is checked: an
    /// over-long destination simply never resolves.
    pub fn destination(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyDestination);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Identity {
    fn borrow(&self) -> &str {
        &self.0
    }
}
