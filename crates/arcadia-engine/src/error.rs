//! # Engine Error Type
//!
//! Unified error type for engine operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Arcadia POS                            │
//! │                                                                         │
//! │  Engine operation                                                      │
//! │       │                                                                 │
//! │       ├── Domain rule violated? ──► CoreError ──┐                      │
//! │       │   (wrong state, no stock,               │                       │
//! │       │    duplicate checkout, ...)             ├──► EngineError       │
//! │       │                                         │                       │
//! │       └── Storage failed? ───────► DbError ─────┘                      │
//! │           (busy, constraint,                                           │
//! │            pool, corrupt row)                                          │
//! │                                                                         │
//! │  Callers match on the variant; an HTTP layer on top would map          │
//! │  Core(...) to 400-equivalents and Db(...) to 500-equivalents, with     │
//! │  NotFound variants as 404-equivalents.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use arcadia_core::{CoreError, ValidationError};
use arcadia_db::DbError;

/// Error returned by engine operations.
///
/// Every failure is one of the typed domain variants (`Core`) or a typed
/// storage failure (`Db`); nothing is stringly-typed. Storage conflicts
/// (`DbError::TransactionFailed`, `DbError::PoolExhausted`) may be retried
/// by the caller with the identical request; the engines never retry on
/// their own.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A domain rule was violated.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The storage layer failed.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl EngineError {
    /// True when the failure means "the referenced thing does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::Core(
                CoreError::ConsoleNotFound(_)
                    | CoreError::ProductNotFound(_)
                    | CoreError::SessionNotFound(_)
                    | CoreError::ReceiptNotFound(_)
            ) | EngineError::Db(DbError::NotFound { .. })
        )
    }

    /// True when retrying the identical request might succeed (storage
    /// conflict or timeout, not a rule violation).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Db(DbError::TransactionFailed(_) | DbError::PoolExhausted)
        )
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_predicate() {
        let err: EngineError = CoreError::SessionNotFound("s1".to_string()).into();
        assert!(err.is_not_found());

        let err: EngineError = CoreError::AlreadyEnded("s1".to_string()).into();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_retryable_predicate() {
        let err: EngineError = DbError::TransactionFailed("database is locked".to_string()).into();
        assert!(err.is_retryable());

        let err: EngineError = CoreError::DuplicateCheckout("s1".to_string()).into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_flows_through_core() {
        let err: EngineError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::Validation(_))
        ));
    }
}
