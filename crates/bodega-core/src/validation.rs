//! # Validation Module
//!
//! Input validation for the stock consistency engine.
//!
//! Preconditions (quantity within stock, branches must differ, counted
//! values non-negative) are centralized here and inside the operations
//! that consume them, so no caller can skip them.

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a transfer quantity.
///
/// ## Rules
/// - Must be strictly positive. The stock-coverage check happens against
///   a concrete source row in [`crate::transfer::validate_start`].
pub fn validate_transfer_qty(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive { field: "qty" });
    }
    Ok(())
}

/// Validates a counted quantity entered during a physical audit.
///
/// ## Rules
/// - Must not be negative. Zero is a legitimate count (shelf is empty).
pub fn validate_counted_qty(counted: i64) -> ValidationResult<()> {
    if counted < 0 {
        return Err(ValidationError::Negative { field: "counted" });
    }
    Ok(())
}

/// Validates a monetary price value.
///
/// ## Rules
/// - Must not be negative. Zero is allowed (free items).
pub fn validate_price(field: &'static str, value: Decimal) -> ValidationResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::Negative { field });
    }
    Ok(())
}

/// Validates a branch name.
///
/// ## Rules
/// - Must not be empty or whitespace-only.
pub fn validate_branch(field: &'static str, branch: &str) -> ValidationResult<()> {
    if branch.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
