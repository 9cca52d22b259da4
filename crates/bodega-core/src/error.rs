//! # Error Types
//!
//! Domain-specific error types for bodega-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  bodega-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                    │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  bodega-db errors (separate crate)                                  │
//! │  ├── DbError          - Store operation failures                    │
//! │  └── EngineError      - CoreError | DbError at the engine boundary  │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → EngineError → Caller           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product, branch, quantities)
//! 3. Errors are enum variants, never String
//! 4. Every user-visible failure carries enough context for the operator
//!    to correct and retry

use thiserror::Error;

use crate::types::TransferStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or illegal state
/// transitions. They should be caught and translated to user-facing
/// messages by the presentation layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Transfer record cannot be found.
    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    /// Source branch stock cannot cover the requested quantity.
    ///
    /// ## When This Occurs
    /// - Starting a transfer for more than the source branch holds
    /// - A concurrent mutation consumed the stock between the precondition
    ///   check and the guarded decrement
    ///
    /// Recoverable: the operator reduces the quantity and retries. The
    /// failed operation never partially applies.
    #[error("Insufficient stock for {product} at {branch}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        branch: String,
        available: i64,
        requested: i64,
    },

    /// Transfer source and destination branches are the same.
    #[error("Transfer source and destination are both '{branch}'")]
    SameBranch { branch: String },

    /// Attempt to finalize a transfer that already reached a terminal state.
    ///
    /// ## When This Occurs
    /// - Receiving an already-received transfer
    /// - Cancelling an already-cancelled transfer
    ///
    /// Hard error, never retried automatically.
    #[error("Transfer {transfer_id} is already {status}, cannot finalize again")]
    AlreadyFinalized {
        transfer_id: String,
        status: TransferStatus,
    },

    /// An audit operation was invoked with no count in progress.
    #[error("No stock count in progress")]
    NoActiveCount,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. Used for
/// early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: &'static str },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
