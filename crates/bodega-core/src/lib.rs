//! # bodega-core: Pure Business Logic for the Bodega Back-Office
//!
//! This crate is the **heart** of the multi-branch stock consistency
//! engine. It contains all business rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   Bodega Back-Office Architecture                   │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │              Presentation / API (out of scope)              │   │
//! │  │   inventory tables ── transfer modal ── count wizard        │   │
//! │  └──────────────────────────────┬──────────────────────────────┘   │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼──────────────────────────────┐   │
//! │  │              ★ bodega-core (THIS CRATE) ★                   │   │
//! │  │                                                             │   │
//! │  │  ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌────────────┐  │   │
//! │  │  │ valuation │ │ transfer  │ │   audit   │ │  pricing   │  │   │
//! │  │  │ VAT math  │ │ state     │ │ variance  │ │ bulk rules │  │   │
//! │  │  │ totals    │ │ machine   │ │ reports   │ │ pending map│  │   │
//! │  │  └───────────┘ └───────────┘ └───────────┘ └────────────┘  │   │
//! │  │                                                             │   │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS         │   │
//! │  └──────────────────────────────┬──────────────────────────────┘   │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼──────────────────────────────┐   │
//! │  │                bodega-db (Database Layer)                    │   │
//! │  │     SQLite stores, migrations, side-effecting engines        │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockTransfer, VatRate, ...)
//! - [`valuation`] - VAT-inclusive/exclusive conversion and stock valuation
//! - [`transfer`] - Transfer state machine rules and preconditions
//! - [`audit`] - Count sessions and variance reports
//! - [`pricing`] - Rule-based bulk price adjustment
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input =
//!    same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Exact Decimals**: All monetary values are `rust_decimal::Decimal`;
//!    rounding to 2 decimals happens once, at the display/commit boundary
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use bodega_core::types::VatRate;
//! use bodega_core::valuation::PriceBreakdown;
//! use rust_decimal::Decimal;
//!
//! // A net purchase price of 100 at 20% VAT
//! let rate = VatRate::from_percent(20);
//! let b = PriceBreakdown::from_price(Decimal::from(100), rate, false).unwrap();
//!
//! assert_eq!(b.exclusive, Decimal::from(100));
//! assert_eq!(b.inclusive, Decimal::from(120));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod error;
pub mod pricing;
pub mod transfer;
pub mod types;
pub mod validation;
pub mod valuation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use bodega_core::Product` instead of
// `use bodega_core::types::Product`

pub use audit::{build_report, AuditLine, AuditOutcome, AuditReport, AuditSession, AuditStatus};
pub use error::{CoreError, CoreResult, ValidationError};
pub use pricing::{
    apply_rule, AdjustKind, AdjustTarget, BulkPriceRule, PendingChanges, PendingPrices,
};
pub use types::*;
pub use valuation::{merged_stock, round2, PriceBreakdown, ValuationTotals};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default critical-stock threshold for products that never configured one.
///
/// ## Business Reason
/// Items at or below their threshold surface in the critical-stock filter;
/// 5 is the catalog-wide default the stores have always used.
pub const DEFAULT_MIN_STOCK: i64 = 5;
