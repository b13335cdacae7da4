//! The module contains the errors the engine can throw.
//!
//! The errors fall in four families:
//!
//! - validation: [`Validation`], raised before anything is written.
//! - authorization: [`Unauthenticated`] and [`Forbidden`], raised before any
//!   computation runs.
//! - consistency: [`AlreadyCompleted`], [`LedgerAlreadyApplied`] and
//!   [`Consistency`], guarding the non idempotent ledger merge.
//! - transient I/O: [`Store`] and [`LedgerPatchPending`], propagated to the
//!   caller for retry.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`Unauthenticated`]: EngineError::Unauthenticated
//!  [`Forbidden`]: EngineError::Forbidden
//!  [`AlreadyCompleted`]: EngineError::AlreadyCompleted
//!  [`LedgerAlreadyApplied`]: EngineError::LedgerAlreadyApplied
//!  [`Consistency`]: EngineError::Consistency
//!  [`Store`]: EngineError::Store
//!  [`LedgerPatchPending`]: EngineError::LedgerPatchPending
use thiserror::Error;

use crate::TripId;

/// Boxed error coming from a store implementation.
pub type StoreSource = Box<dyn std::error::Error + Send + Sync>;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Not signed in")]
    Unauthenticated,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Trip {0} is already completed")]
    AlreadyCompleted(TripId),
    #[error("Ledger of trip {0} was already updated")]
    LedgerAlreadyApplied(TripId),
    #[error("Inconsistent data: {0}")]
    Consistency(String),
    #[error("Trip {trip_id} completed but the ledger update failed: {source}")]
    LedgerPatchPending {
        trip_id: TripId,
        #[source]
        source: StoreSource,
    },
    #[error("Store error: {0}")]
    Store(#[source] StoreSource),
}

impl EngineError {
    /// Wraps a store failure.
    pub fn store<E>(err: E) -> Self
    where
        E: Into<StoreSource>,
    {
        Self::Store(err.into())
    }

    /// `true` when retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Store(_) | Self::LedgerPatchPending { .. })
    }

    /// Message to show to the end user.
    ///
    /// Validation, authorization and consistency errors are specific. Store
    /// errors are generic; the caller logs their cause.
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(_) => {
                "Something went wrong while talking to the server. Please try again.".to_string()
            }
            Self::LedgerPatchPending { .. } => {
                "The trip was closed but balances were not updated yet. Please retry.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::Unauthenticated, Self::Unauthenticated) => true,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::AlreadyCompleted(a), Self::AlreadyCompleted(b)) => a == b,
            (Self::LedgerAlreadyApplied(a), Self::LedgerAlreadyApplied(b)) => a == b,
            (Self::Consistency(a), Self::Consistency(b)) => a == b,
            (
                Self::LedgerPatchPending {
                    trip_id: a,
                    source: sa,
                },
                Self::LedgerPatchPending {
                    trip_id: b,
                    source: sb,
                },
            ) => a == b && sa.to_string() == sb.to_string(),
            (Self::Store(a), Self::Store(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn store_errors_are_transient_and_generic() {
        let err = EngineError::store("connection reset");
        assert!(err.is_transient());
        assert!(!err.user_message().contains("connection reset"));
    }

    #[test]
    fn validation_errors_are_specific() {
        let err = EngineError::Validation("amount must be positive".to_string());
        assert!(!err.is_transient());
        assert_eq!(err.user_message(), "Invalid input: amount must be positive");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn user_message_does_not_log() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let err = EngineError::LedgerPatchPending {
                trip_id: TripId::new_v4(),
                source: Box::new(std::io::Error::other("connection reset")),
            };
            assert_eq!(err.user_message(), err.user_message());
            let _ = EngineError::store("connection reset").user_message();
        });

        assert!(captured.0.lock().unwrap().is_empty());
    }
}
