//! # Error Types
//!
//! Domain-specific error types for arcadia-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  arcadia-core errors (this file)                                       │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  arcadia-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  arcadia-engine errors                                                 │
//! │  └── EngineError      - Core + Db unified for callers                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (session id, stock counts, etc.)
//! 3. Errors are enum variants, never String
//! 4. Each variant maps onto one caller-facing failure mode

use thiserror::Error;

use crate::types::{GamingMode, SessionStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent domain rule violations. Every failure path in the
/// engines surfaces one of these variants (or a storage error); nothing is
/// ever reported as a bare string.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Console cannot be found.
    #[error("Console not found: {0}")]
    ConsoleNotFound(String),

    /// Product cannot be found (or is soft-deleted).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Session cannot be found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Receipt cannot be found.
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    /// Console cannot back a new session right now.
    ///
    /// ## When This Occurs
    /// - Console status is in_use, maintenance, or reserved
    /// - Console id does not exist (status reads "missing")
    /// - Another start call claimed the console first
    #[error("Console {console_id} is {status}, cannot start a session")]
    ConsoleUnavailable {
        console_id: String,
        status: String,
    },

    /// The requested gaming mode has no positive rate on this console.
    #[error("Console {console_id} does not support {mode} (no positive rate)")]
    UnsupportedMode {
        console_id: String,
        mode: GamingMode,
    },

    /// A lifecycle operation was called from the wrong state.
    ///
    /// ## When This Occurs
    /// - pause on a session that is not active
    /// - resume on a session that is not paused
    /// - mode change on an ended session
    ///
    /// The caller must re-fetch session state before retrying.
    #[error("Session {session_id} is {current}, cannot {operation}")]
    InvalidTransition {
        session_id: String,
        current: SessionStatus,
        operation: &'static str,
    },

    /// end was called on a session that already ended.
    #[error("Session {0} has already ended")]
    AlreadyEnded(String),

    /// Insufficient stock to complete a sale or tab addition.
    ///
    /// ## When This Occurs
    /// - add_item requests more than the catalog holds
    /// - a checkout cart line exceeds current stock (whole checkout rolls back)
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Checkout referenced a session that has not ended yet.
    #[error("Session {0} has not ended, cannot check out")]
    SessionNotEnded(String),

    /// Checkout referenced a session that already has a receipt.
    #[error("Session {0} has already been checked out")]
    DuplicateCheckout(String),

    /// An ended session is missing its calculated cost.
    ///
    /// Should not happen through the engine; guards against rows written by
    /// other tools.
    #[error("Session {0} has no calculated cost")]
    CostNotCalculated(String),

    /// The price that would be charged is negative.
    #[error("Charged price cannot be negative: {0} cents")]
    NegativePrice(i64),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, unknown enum text).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
