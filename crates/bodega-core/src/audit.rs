//! # Physical Audit Reconciliation
//!
//! Pure rules for a branch stocktake: the count session, the variance
//! report, and nothing else. Persistence and the debounced checkpoint
//! live in bodega-db.
//!
//! ## Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Audit Workflow                                 │
//! │                                                                     │
//! │  start count ──► AuditSession { InProgress, items: {} }             │
//! │       │                                                             │
//! │       ▼  (operator types counts; entries overwrite, idempotent)     │
//! │  record_count(product, qty) × N                                     │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  build_report(session, live products)                               │
//! │       ├── every diff == 0 ──► NoVariance (explicit outcome)         │
//! │       └── some diff != 0 ──► AuditReport { lines }                  │
//! │                                   │                                 │
//! │                                   ▼  confirm                        │
//! │                     commit: stock = counted per line (engine)       │
//! │                     session → Completed                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counting without variance is a legitimate outcome, never an error:
//! the report just has nothing to correct, and the operator is told so.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::Product;
use crate::validation::validate_counted_qty;

// =============================================================================
// Audit Status
// =============================================================================

/// Lifecycle state of a branch count session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    InProgress,
    Completed,
}

impl AuditStatus {
    /// Returns the wire/database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::InProgress => "in_progress",
            AuditStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AuditStatus::InProgress),
            "completed" => Ok(AuditStatus::Completed),
            other => Err(format!("unknown audit status '{other}'")),
        }
    }
}

// =============================================================================
// Audit Session
// =============================================================================

/// One branch's stocktake in progress. At most one per branch: the branch
/// name is the session key, so concurrent sessions on a branch are
/// impossible by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSession {
    /// Scope of the count.
    pub branch: String,
    pub status: AuditStatus,
    /// productId → counted quantity, built incrementally. BTreeMap keeps
    /// report lines and commit order deterministic.
    pub items: BTreeMap<String, i64>,
    /// Operator running the count.
    pub reported_by: String,
}

impl AuditSession {
    /// Opens a fresh session for a branch.
    pub fn new(branch: &str, reported_by: &str) -> Self {
        AuditSession {
            branch: branch.to_string(),
            status: AuditStatus::InProgress,
            items: BTreeMap::new(),
            reported_by: reported_by.to_string(),
        }
    }

    /// Stores or overwrites one counted entry.
    ///
    /// Idempotent: re-entering the same product replaces the prior value,
    /// leaving exactly one entry for it.
    pub fn record_count(&mut self, product_id: &str, counted: i64) -> CoreResult<()> {
        if self.status != AuditStatus::InProgress {
            return Err(CoreError::NoActiveCount);
        }
        validate_counted_qty(counted)?;
        self.items.insert(product_id.to_string(), counted);
        Ok(())
    }

    #[inline]
    pub fn is_in_progress(&self) -> bool {
        self.status == AuditStatus::InProgress
    }
}

// =============================================================================
// Variance Report
// =============================================================================

/// One variance line: counted differs from system stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLine {
    pub product_id: String,
    pub product_name: String,
    /// Live stock at report time.
    pub system_stock: i64,
    pub counted: i64,
    /// `counted - system_stock`; never zero in a report.
    pub diff: i64,
    /// `diff * buy_price`: the cost impact of the correction.
    pub cost_diff: Decimal,
}

/// Variance report for one branch count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub branch: String,
    pub lines: Vec<AuditLine>,
}

impl AuditReport {
    /// Aggregate cost impact across all lines, at full precision.
    pub fn total_cost_diff(&self) -> Decimal {
        self.lines.iter().map(|l| l.cost_diff).sum()
    }
}

/// Result of building a report: either corrections to review, or the
/// explicit "nothing to correct" outcome. Never a silent empty report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AuditOutcome {
    Variance(AuditReport),
    /// Every counted entry matched system stock.
    NoVariance {
        /// How many items were counted (and confirmed correct).
        counted_items: usize,
    },
}

/// Diffs the session's counted values against live product rows.
///
/// Zero-diff entries are excluded from the report but remain counted.
/// Entries whose product no longer exists in the live set are skipped.
/// Reads always use the in-memory session, never a persisted snapshot.
pub fn build_report(session: &AuditSession, products: &[Product]) -> AuditOutcome {
    let mut lines = Vec::new();

    for (product_id, &counted) in &session.items {
        let Some(product) = products.iter().find(|p| &p.id == product_id) else {
            continue;
        };

        let diff = counted - product.stock;
        if diff == 0 {
            continue;
        }

        lines.push(AuditLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            system_stock: product.stock,
            counted,
            diff,
            cost_diff: Decimal::from(diff) * product.buy_price,
        });
    }

    if lines.is_empty() {
        AuditOutcome::NoVariance {
            counted_items: session.items.len(),
        }
    } else {
        AuditOutcome::Variance(AuditReport {
            branch: session.branch.clone(),
            lines,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VatRate;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn test_product(id: &str, stock: i64, buy_price: Decimal) -> Product {
        Product {
            id: id.to_string(),
            code: format!("SKU-{id}"),
            name: format!("Product {id}"),
            brand: None,
            category: None,
            branch: "Merkez".to_string(),
            stock,
            min_stock: 5,
            buy_price,
            price: dec!(150),
            purchase_vat: VatRate::from_percent(20),
            sales_vat: VatRate::from_percent(20),
            purchase_vat_included: false,
            sales_vat_included: false,
            currency: "TRY".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_count_is_idempotent() {
        let mut session = AuditSession::new("Merkez", "Ayşe");
        session.record_count("P1", 5).unwrap();
        session.record_count("P1", 5).unwrap();

        assert_eq!(session.items.len(), 1);
        assert_eq!(session.items["P1"], 5);
    }

    #[test]
    fn test_record_count_overwrites_prior_value() {
        let mut session = AuditSession::new("Merkez", "Ayşe");
        session.record_count("P1", 5).unwrap();
        session.record_count("P1", 9).unwrap();

        assert_eq!(session.items["P1"], 9);
    }

    #[test]
    fn test_record_count_rejects_negative() {
        let mut session = AuditSession::new("Merkez", "Ayşe");
        assert!(session.record_count("P1", -1).is_err());
        assert!(session.record_count("P1", 0).is_ok());
    }

    #[test]
    fn test_record_count_rejects_completed_session() {
        let mut session = AuditSession::new("Merkez", "Ayşe");
        session.status = AuditStatus::Completed;
        assert!(matches!(
            session.record_count("P1", 5),
            Err(CoreError::NoActiveCount)
        ));
    }

    #[test]
    fn test_report_diff_and_cost_diff() {
        // counted=8 while systemStock=10 → diff=-2, costDiff = -2 * buyPrice
        let products = vec![test_product("P4", 10, dec!(75.50))];
        let mut session = AuditSession::new("Merkez", "Ayşe");
        session.record_count("P4", 8).unwrap();

        match build_report(&session, &products) {
            AuditOutcome::Variance(report) => {
                assert_eq!(report.lines.len(), 1);
                let line = &report.lines[0];
                assert_eq!(line.diff, -2);
                assert_eq!(line.counted, 8);
                assert_eq!(line.system_stock, 10);
                assert_eq!(line.cost_diff, dec!(-151.00));
                assert_eq!(report.total_cost_diff(), dec!(-151.00));
            }
            AuditOutcome::NoVariance { .. } => panic!("expected variance"),
        }
    }

    #[test]
    fn test_zero_diff_entries_are_suppressed() {
        let products = vec![
            test_product("P1", 10, dec!(50)),
            test_product("P2", 4, dec!(20)),
        ];
        let mut session = AuditSession::new("Merkez", "Ayşe");
        session.record_count("P1", 10).unwrap(); // matches
        session.record_count("P2", 6).unwrap(); // diff +2

        match build_report(&session, &products) {
            AuditOutcome::Variance(report) => {
                assert_eq!(report.lines.len(), 1);
                assert_eq!(report.lines[0].product_id, "P2");
                assert_eq!(report.lines[0].diff, 2);
            }
            AuditOutcome::NoVariance { .. } => panic!("expected variance"),
        }
    }

    #[test]
    fn test_all_matching_counts_yield_no_variance() {
        let products = vec![
            test_product("P1", 10, dec!(50)),
            test_product("P2", 4, dec!(20)),
        ];
        let mut session = AuditSession::new("Merkez", "Ayşe");
        session.record_count("P1", 10).unwrap();
        session.record_count("P2", 4).unwrap();

        match build_report(&session, &products) {
            AuditOutcome::NoVariance { counted_items } => assert_eq!(counted_items, 2),
            AuditOutcome::Variance(_) => panic!("expected no variance"),
        }
    }

    #[test]
    fn test_missing_products_are_skipped() {
        let products = vec![test_product("P1", 10, dec!(50))];
        let mut session = AuditSession::new("Merkez", "Ayşe");
        session.record_count("P1", 12).unwrap();
        session.record_count("GONE", 3).unwrap();

        match build_report(&session, &products) {
            AuditOutcome::Variance(report) => {
                assert_eq!(report.lines.len(), 1);
                assert_eq!(report.lines[0].product_id, "P1");
            }
            AuditOutcome::NoVariance { .. } => panic!("expected variance"),
        }
    }
}
