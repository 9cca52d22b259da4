//! # Stock Transfer State Machine
//!
//! Pure rules for one unit of inter-branch stock movement.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Transfer Lifecycle                               │
//! │                                                                     │
//! │  start (source stock -= qty)                                        │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  InTransit ──── Receive ────► Received   (dest stock += qty)        │
//! │       │                                                             │
//! │       └──────── Cancel ─────► Cancelled  (source stock += qty)      │
//! │                                                                     │
//! │  Terminal states are immutable. Finalizing twice is                 │
//! │  AlreadyFinalized, a hard error.                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module owns state legality and preconditions only. WHO may
//! receive or cancel is the permission collaborator's concern; WHERE the
//! stock deltas land atomically is the engine's concern (bodega-db).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::types::{BranchScope, Product, StockTransfer, TransferStatus};
use crate::validation::{validate_branch, validate_transfer_qty};

// =============================================================================
// Start Preconditions
// =============================================================================

/// Checks every precondition for starting a transfer out of `product`'s
/// branch row.
///
/// ## Rules
/// - `qty` strictly positive
/// - destination differs from the source branch
/// - source stock covers `qty` (checked again by the guarded decrement in
///   the store, so a racing mutation cannot slip through)
pub fn validate_start(product: &Product, qty: i64, to_branch: &str) -> CoreResult<()> {
    validate_transfer_qty(qty)?;
    validate_branch("to_branch", to_branch)?;

    if product.branch == to_branch {
        return Err(CoreError::SameBranch {
            branch: product.branch.clone(),
        });
    }

    if product.stock < qty {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            branch: product.branch.clone(),
            available: product.stock,
            requested: qty,
        });
    }

    Ok(())
}

// =============================================================================
// Construction & Transitions
// =============================================================================

impl StockTransfer {
    /// Builds the `InTransit` record for a validated start, freezing the
    /// product's code and name.
    pub fn in_transit(
        product: &Product,
        qty: i64,
        to_branch: &str,
        requested_by: &str,
        notes: Option<&str>,
        shipped_at: DateTime<Utc>,
    ) -> Self {
        StockTransfer {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            product_code: product.code.clone(),
            product_name: product.name.clone(),
            qty,
            from_branch: product.branch.clone(),
            to_branch: to_branch.to_string(),
            status: TransferStatus::InTransit,
            requested_by: requested_by.to_string(),
            received_by: None,
            notes: notes.map(str::to_string),
            shipped_at,
            received_at: None,
        }
    }

    /// Errors with `AlreadyFinalized` unless the transfer is still in
    /// transit.
    pub fn ensure_in_transit(&self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::AlreadyFinalized {
                transfer_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Transitions InTransit → Received, recording the receiving actor.
    pub fn receive(&mut self, received_by: &str, received_at: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_in_transit()?;
        self.status = TransferStatus::Received;
        self.received_by = Some(received_by.to_string());
        self.received_at = Some(received_at);
        Ok(())
    }

    /// Transitions InTransit → Cancelled.
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.ensure_in_transit()?;
        self.status = TransferStatus::Cancelled;
        Ok(())
    }

    /// Visibility filter: a transfer is visible to a branch scope when the
    /// scope is all-branches or matches either endpoint. Pure filter, not
    /// a state concern.
    pub fn is_visible_to(&self, scope: &BranchScope) -> bool {
        scope.matches(&self.from_branch) || scope.matches(&self.to_branch)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VatRate;
    use rust_decimal_macros::dec;

    fn source_product(stock: i64) -> Product {
        Product {
            id: "p1".to_string(),
            code: "BOYA-5L".to_string(),
            name: "Duvar Boyası 5L".to_string(),
            brand: None,
            category: None,
            branch: "Merkez".to_string(),
            stock,
            min_stock: 5,
            buy_price: dec!(100),
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
    fn test_validate_start_ok() {
        assert!(validate_start(&source_product(20), 5, "Kadıköy").is_ok());
    }

    #[test]
    fn test_validate_start_rejects_non_positive_qty() {
        assert!(validate_start(&source_product(20), 0, "Kadıköy").is_err());
        assert!(validate_start(&source_product(20), -2, "Kadıköy").is_err());
    }

    #[test]
    fn test_validate_start_rejects_same_branch() {
        let err = validate_start(&source_product(20), 5, "Merkez").unwrap_err();
        assert!(matches!(err, CoreError::SameBranch { .. }));
    }

    #[test]
    fn test_validate_start_rejects_insufficient_stock() {
        let err = validate_start(&source_product(3), 5, "Kadıköy").unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn test_receive_transition() {
        let product = source_product(20);
        let mut transfer =
            StockTransfer::in_transit(&product, 5, "Kadıköy", "Ayşe", None, Utc::now());
        assert_eq!(transfer.status, TransferStatus::InTransit);

        transfer.receive("Mehmet", Utc::now()).unwrap();
        assert_eq!(transfer.status, TransferStatus::Received);
        assert_eq!(transfer.received_by.as_deref(), Some("Mehmet"));
        assert!(transfer.received_at.is_some());
    }

    #[test]
    fn test_cancel_transition() {
        let product = source_product(20);
        let mut transfer =
            StockTransfer::in_transit(&product, 5, "Kadıköy", "Ayşe", None, Utc::now());

        transfer.cancel().unwrap();
        assert_eq!(transfer.status, TransferStatus::Cancelled);
        assert!(transfer.received_by.is_none());
    }

    #[test]
    fn test_finalizing_twice_is_rejected() {
        let product = source_product(20);
        let mut transfer =
            StockTransfer::in_transit(&product, 5, "Kadıköy", "Ayşe", None, Utc::now());
        transfer.receive("Mehmet", Utc::now()).unwrap();

        let err = transfer.cancel().unwrap_err();
        assert!(matches!(err, CoreError::AlreadyFinalized { .. }));

        let err = transfer.receive("Mehmet", Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyFinalized { .. }));
    }

    #[test]
    fn test_visibility_filter() {
        let product = source_product(20);
        let transfer = StockTransfer::in_transit(&product, 5, "Kadıköy", "Ayşe", None, Utc::now());

        assert!(transfer.is_visible_to(&BranchScope::All));
        assert!(transfer.is_visible_to(&BranchScope::Branch("Merkez".to_string())));
        assert!(transfer.is_visible_to(&BranchScope::Branch("Kadıköy".to_string())));
        assert!(!transfer.is_visible_to(&BranchScope::Branch("Bostancı".to_string())));
    }
}
