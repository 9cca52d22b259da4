//! # Repository Pattern Implementation
//!
//! Data access layer: each store owns the SQL for one table family and
//! translates between rows and the domain types in `bodega-core`.
//!
//! ## Design
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Repository Layer                               │
//! │                                                                     │
//! │  Engines (transfer, audit, pricing)                                 │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Repositories (this module) ← SQL lives here, nowhere else          │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SqlitePool (shared, cloned cheaply)                                │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - Row structs (`#[derive(sqlx::FromRow)]`) mirror the table exactly;
//!   `TryFrom<Row>` converts to the domain type and is where corrupt
//!   stored values surface as [`crate::error::DbError::Decode`]
//! - Guarded mutations (`UPDATE ... WHERE <precondition>`) return
//!   `DbResult<bool>`: `false` means the precondition failed, which the
//!   caller maps to its own domain error
//! - Multi-row invariants (transfer create/finalize) run inside a single
//!   transaction

pub mod audit;
pub mod product;
pub mod transfer;

pub use audit::AuditRepository;
pub use product::ProductRepository;
pub use transfer::TransferRepository;
