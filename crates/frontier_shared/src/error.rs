//! # Schema Error Types
//!
//! Validation failures for inbound wire messages. These are rejected before
//! anything touches world state and are reported to the sender only.

use thiserror::Error;

/// Errors raised while parsing or validating a wire message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The payload is not valid JSON or does not match the message shape
    /// (includes missing required fields and unknown discriminants).
    #[error("malformed message: {0}")]
    Malformed(String),

    /// A field is present but its value is not acceptable.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Wire name of the offending field.
        field: &'static str,
        /// Human readable explanation.
        reason: String,
    },

    /// The envelope and the payload disagree about the sender.
    #[error("client id mismatch: envelope {envelope}, intent {intent}")]
    ClientMismatch {
        /// Client id on the envelope.
        envelope: String,
        /// Client id inside the intent payload.
        intent: String,
    },
}

impl SchemaError {
    /// Shorthand for [`SchemaError::InvalidField`].
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Result type for schema validation.
pub type SchemaResult<T> = Result<T, SchemaError>;
