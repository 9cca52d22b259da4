//! # Domain Types
//!
//! Core domain types for the multi-branch stock consistency engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐  │
//! │  │    Product      │   │  StockTransfer   │   │  AuditSession   │  │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────  │  │
//! │  │  id (UUID)      │   │  id (UUID)       │   │  branch (key)   │  │
//! │  │  code (SKU)     │   │  qty (fixed)     │   │  items (counts) │  │
//! │  │  branch + stock │   │  from → to       │   │  status         │  │
//! │  │  prices + VAT   │   │  status          │   └─────────────────┘  │
//! │  └─────────────────┘   └──────────────────┘                        │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐  │
//! │  │    VatRate      │   │  TransferStatus  │   │  BranchScope    │  │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────  │  │
//! │  │  percent (u32)  │   │  InTransit       │   │  All            │  │
//! │  │  20 = 20%       │   │  Received        │   │  Branch(name)   │  │
//! │  └─────────────────┘   │  Cancelled       │   └─────────────────┘  │
//! │                        └──────────────────┘                        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Per-Branch Ledger of Truth
//! A `Product` row is the stock ledger for ONE branch. The same SKU at
//! another branch is a separate row sharing the `code`. The "merged"
//! all-branch view is derived (see [`crate::valuation`]); the per-branch
//! rows stay authoritative.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate as an integer percentage.
///
/// In practice the catalog uses 0/1/10/20, but any non-negative integer
/// is valid. Negative rates are unrepresentable by construction (`u32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VatRate(u32);

impl VatRate {
    /// Creates a VAT rate from an integer percentage.
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        VatRate(pct)
    }

    /// Returns the rate as an integer percentage.
    #[inline]
    pub const fn percent(&self) -> u32 {
        self.0
    }

    /// Returns the gross/net factor `1 + rate/100` as an exact decimal.
    ///
    /// Division by zero is impossible: the factor is >= 1 for every
    /// representable rate.
    pub fn factor(&self) -> Decimal {
        Decimal::from(100 + self.0 as i64) / Decimal::from(100)
    }

    /// Zero VAT rate.
    #[inline]
    pub const fn zero() -> Self {
        VatRate(0)
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate::zero()
    }
}

// =============================================================================
// Product
// =============================================================================

/// One product's stock ledger row at one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock keeping unit code - shared by the same product across
    /// branches (the branch-family key).
    pub code: String,

    /// Display name.
    pub name: String,

    /// Optional brand tag for filtering.
    pub brand: Option<String>,

    /// Optional category tag for filtering.
    pub category: Option<String>,

    /// The branch this stock row belongs to.
    pub branch: String,

    /// Quantity on hand at this branch. Never negative after a committed
    /// mutation; a mutation that would drive it negative is rejected.
    pub stock: i64,

    /// Threshold at or below which the item counts as critical.
    pub min_stock: i64,

    /// Purchase price, net or gross depending on `purchase_vat_included`.
    pub buy_price: Decimal,

    /// Sales price, net or gross depending on `sales_vat_included`.
    pub price: Decimal,

    /// Purchase VAT rate (integer percent).
    pub purchase_vat: VatRate,

    /// Sales VAT rate (integer percent).
    pub sales_vat: VatRate,

    /// Whether `buy_price` already contains VAT.
    pub purchase_vat_included: bool,

    /// Whether `price` already contains VAT.
    pub sales_vat_included: bool,

    /// Display currency tag. No conversion is ever performed on it.
    pub currency: String,

    /// When the row was created.
    pub created_at: DateTime<Utc>,

    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks whether the branch stock is at or below the critical
    /// threshold.
    #[inline]
    pub fn is_critical(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Transfer Status
// =============================================================================

/// Lifecycle state of an inter-branch stock transfer.
///
/// ```text
///               ┌──► Received   (terminal)
///  InTransit ───┤
///               └──► Cancelled  (terminal)
/// ```
///
/// Once terminal, the record is immutable. Stored as its wire string
/// (`IN_TRANSIT`/`RECEIVED`/`CANCELLED`) in the database and in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    /// Stock has left the source branch and is on its way.
    InTransit,
    /// Destination branch accepted the goods.
    Received,
    /// Transfer was cancelled; stock returned to the source branch.
    Cancelled,
}

impl TransferStatus {
    /// Returns the wire/database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::InTransit => "IN_TRANSIT",
            TransferStatus::Received => "RECEIVED",
            TransferStatus::Cancelled => "CANCELLED",
        }
    }

    /// Checks whether the status is terminal (Received or Cancelled).
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::InTransit)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_TRANSIT" => Ok(TransferStatus::InTransit),
            "RECEIVED" => Ok(TransferStatus::Received),
            "CANCELLED" => Ok(TransferStatus::Cancelled),
            other => Err(format!("unknown transfer status '{other}'")),
        }
    }
}

// =============================================================================
// Transfer Action
// =============================================================================

/// The two ways an in-transit transfer can be finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferAction {
    /// Destination accepts the goods; destination stock is credited.
    Receive,
    /// Shipment is called back; source stock is restored.
    Cancel,
}

// =============================================================================
// Stock Transfer
// =============================================================================

/// A directional movement of a fixed quantity of one product from one
/// branch to another.
///
/// ## Snapshot Pattern
/// `product_code` and `product_name` are frozen at creation so the record
/// stays meaningful even if the catalog row is renamed or removed later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockTransfer {
    pub id: String,
    pub product_id: String,
    /// SKU at time of shipment (frozen).
    pub product_code: String,
    /// Product name at time of shipment (frozen).
    pub product_name: String,
    /// Quantity moved. Positive, fixed at creation.
    pub qty: i64,
    pub from_branch: String,
    pub to_branch: String,
    pub status: TransferStatus,
    /// Who started the shipment.
    pub requested_by: String,
    /// Who accepted the goods (set on receive).
    pub received_by: Option<String>,
    /// Free-text note attached at creation.
    pub notes: Option<String>,
    pub shipped_at: DateTime<Utc>,
    pub received_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Branch Scope
// =============================================================================

/// A viewing scope over branches: everything, or one named branch.
///
/// Used by the transfer visibility filter and the valuation aggregates.
/// This is a pure display/filter concern, never a state concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchScope {
    /// All branches (the merged view).
    All,
    /// One branch by name.
    Branch(String),
}

impl BranchScope {
    /// Checks whether a branch name falls inside this scope.
    pub fn matches(&self, branch: &str) -> bool {
        match self {
            BranchScope::All => true,
            BranchScope::Branch(name) => name == branch,
        }
    }
}

// =============================================================================
// Batch Outcomes
// =============================================================================

/// One failed line of a multi-item operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub product_id: String,
    pub product_name: String,
    /// Human-readable reason, rendered from the underlying error.
    pub reason: String,
}

/// Result of a sequential, independently-failing multi-item loop
/// (batch shipment, audit commit, bulk price save).
///
/// ## Why Not a Single Boolean?
/// Partial completion must stay visible: items that succeeded are
/// committed and stay committed; the operator retries only the failures.
/// Collapsing to success/failure would hide that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome<T> {
    /// Items that committed, in loop order.
    pub succeeded: Vec<T>,
    /// Items that failed, with per-item context.
    pub failed: Vec<BatchFailure>,
}

impl<T> BatchOutcome<T> {
    /// Creates an empty outcome to accumulate into.
    pub fn new() -> Self {
        BatchOutcome {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of committed items.
    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    /// Number of failed items.
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// True when at least one item succeeded and at least one failed.
    pub fn is_partial(&self) -> bool {
        !self.succeeded.is_empty() && !self.failed.is_empty()
    }

    /// True when every item committed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_vat_rate_factor() {
        assert_eq!(VatRate::from_percent(20).factor(), dec!(1.2));
        assert_eq!(VatRate::from_percent(0).factor(), dec!(1));
        assert_eq!(VatRate::from_percent(1).factor(), dec!(1.01));
    }

    #[test]
    fn test_transfer_status_round_trip() {
        for status in [
            TransferStatus::InTransit,
            TransferStatus::Received,
            TransferStatus::Cancelled,
        ] {
            let parsed: TransferStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("SHIPPED".parse::<TransferStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TransferStatus::InTransit.is_terminal());
        assert!(TransferStatus::Received.is_terminal());
        assert!(TransferStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_branch_scope_matches() {
        assert!(BranchScope::All.matches("Merkez"));
        assert!(BranchScope::Branch("Merkez".to_string()).matches("Merkez"));
        assert!(!BranchScope::Branch("Merkez".to_string()).matches("Kadıköy"));
    }

    #[test]
    fn test_batch_outcome_counts() {
        let mut outcome: BatchOutcome<String> = BatchOutcome::new();
        assert!(outcome.is_clean());
        assert!(!outcome.is_partial());

        outcome.succeeded.push("a".to_string());
        outcome.failed.push(BatchFailure {
            product_id: "b".to_string(),
            product_name: "B".to_string(),
            reason: "boom".to_string(),
        });

        assert_eq!(outcome.succeeded_count(), 1);
        assert_eq!(outcome.failed_count(), 1);
        assert!(outcome.is_partial());
        assert!(!outcome.is_clean());
    }
}
