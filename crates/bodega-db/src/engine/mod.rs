//! # Engines
//!
//! Side-effecting orchestration on top of the pure rules in bodega-core
//! and the stores in [`crate::repository`].
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Engine Layer                                 │
//! │                                                                     │
//! │  TransferEngine   start / finalize / batch shipment / listing       │
//! │  AuditEngine      count session + debounced persistence + commit    │
//! │  PricingEngine    bulk price save + stock valuation                 │
//! │                                                                     │
//! │  Rules come from bodega-core; SQL comes from the repositories.      │
//! │  An engine method is the unit a caller retries.                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Multi-Item Loops
//! Batch shipment, audit commit and bulk price save iterate sequentially
//! and let each item fail independently, accumulating a
//! [`bodega_core::BatchOutcome`]. Committed items stay committed; the
//! caller retries only the failed ones.

pub mod audit;
pub mod pricing;
pub mod transfer;

pub use audit::{AuditEngine, Checkpoint};
pub use pricing::PricingEngine;
pub use transfer::{TransferEngine, TransferRequest};

use thiserror::Error;

use bodega_core::CoreError;

use crate::error::DbError;

/// Engine-level error: a business rule violation or a store failure.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Business rule violation from bodega-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Persistence failure from the store layer.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
