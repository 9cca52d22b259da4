//! # bodega-db: Persistence and Engines for the Bodega Back-Office
//!
//! SQLite persistence, schema migrations, and the side-effecting engines
//! that drive the stock consistency flows on top of the pure rules in
//! [`bodega_core`].
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         bodega-db                                   │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                        Engines                                │ │
//! │  │  TransferEngine ──── AuditEngine ──── PricingEngine           │ │
//! │  │  (rules from bodega-core, effects through the stores)         │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │                      Repositories                             │ │
//! │  │  ProductRepository ── TransferRepository ── AuditRepository   │ │
//! │  │  (all SQL lives here; guarded single-row mutations)           │ │
//! │  └──────────────────────────────┬────────────────────────────────┘ │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐ │
//! │  │         SqlitePool (WAL mode, embedded migrations)            │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use bodega_db::{Database, DbConfig, TransferEngine};
//!
//! let db = Database::new(DbConfig::new("/path/to/bodega.db")).await?;
//! let transfers = TransferEngine::new(db.clone());
//! ```

pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use engine::{
    AuditEngine, EngineError, EngineResult, PricingEngine, TransferEngine, TransferRequest,
};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{AuditRepository, ProductRepository, TransferRepository};
