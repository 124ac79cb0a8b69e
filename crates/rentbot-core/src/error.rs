// SPDX-FileCopyrightText: 2026 Rentbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Rentbot booking engine.

use thiserror::Error;

use crate::types::BookingStatus;

/// The primary error type used across the store, services, and adapters.
///
/// Domain variants are mapped to user-visible replies by the chat orchestrator.
/// Infrastructure variants are logged with context before being surfaced.
#[derive(Debug, Error)]
pub enum RentError {
    /// The item has no free capacity on the requested date.
    #[error("item is not available on the requested date")]
    NotAvailable,

    /// The requested date lies before the earliest bookable moment.
    #[error("date is in the past")]
    PastDate,

    /// The requested date lies beyond the booking horizon.
    #[error("date is too far in the future")]
    DateTooFar,

    /// An optimistic version check failed or a serialisable write kept conflicting.
    #[error("concurrent modification detected")]
    ConcurrentModification,

    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// User input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A booking status change that the lifecycle does not permit.
    #[error("invalid booking transition from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging transport errors (send failure, malformed identifiers).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Errors reported by the external mirror sink.
    #[error("remote sink error: {message}")]
    RemoteSink {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RentError {
    /// Shorthand for a [`RentError::NotFound`] with a displayable id.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a sink error without an underlying source.
    pub fn remote_sink(message: impl Into<String>) -> Self {
        Self::RemoteSink {
            message: message.into(),
            source: None,
        }
    }

    /// Returns `true` for errors caused by the request itself rather than the infrastructure.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Self::NotAvailable
                | Self::PastDate
                | Self::DateTooFar
                | Self::ConcurrentModification
                | Self::NotFound { .. }
                | Self::Validation(_)
                | Self::InvalidTransition { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_are_classified() {
        assert!(RentError::NotAvailable.is_domain());
        assert!(RentError::PastDate.is_domain());
        assert!(RentError::DateTooFar.is_domain());
        assert!(RentError::ConcurrentModification.is_domain());
        assert!(RentError::not_found("booking", 42).is_domain());
        assert!(RentError::Validation("bad".into()).is_domain());
        assert!(
            RentError::InvalidTransition {
                from: BookingStatus::Canceled,
                to: BookingStatus::Confirmed,
            }
            .is_domain()
        );
    }

    #[test]
    fn infra_errors_are_not_domain() {
        let storage = RentError::Storage {
            source: Box::new(std::io::Error::other("disk")),
        };
        assert!(!storage.is_domain());
        assert!(!RentError::transport("down").is_domain());
        assert!(!RentError::remote_sink("503").is_domain());
    }

    #[test]
    fn not_found_renders_entity_and_id() {
        let err = RentError::not_found("item", 7);
        assert_eq!(err.to_string(), "item not found: 7");
    }
}
