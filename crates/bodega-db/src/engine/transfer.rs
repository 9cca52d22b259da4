//! # Transfer Engine
//!
//! Orchestrates inter-branch stock transfers: validates with the pure
//! rules, persists with the guarded transactional store methods, and
//! runs the sequential batch shipment loop.
//!
//! ## Failure Atomicity
//! A single transfer either fully applies (stock delta + record) or not
//! at all; there is no state where stock moved but no record exists. A
//! batch is NOT atomic across items: each line commits or fails on its
//! own and the outcome reports both sides.

use chrono::Utc;
use tracing::{info, warn};

use bodega_core::{
    transfer::validate_start, BatchFailure, BatchOutcome, BranchScope, CoreError, StockTransfer,
    TransferAction, TransferStatus,
};

use crate::engine::{EngineError, EngineResult};
use crate::error::DbError;
use crate::pool::Database;

/// One line of a shipment request.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub product_id: String,
    pub qty: i64,
}

/// Engine for starting, finalizing and listing stock transfers.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    db: Database,
}

impl TransferEngine {
    /// Creates a new transfer engine over a database handle.
    pub fn new(db: Database) -> Self {
        TransferEngine { db }
    }

    /// Starts one transfer: validates, debits the source branch and
    /// records the shipment atomically.
    ///
    /// The stock precondition is checked twice: here against the loaded
    /// row (for a precise error message) and again inside the guarded
    /// decrement (for correctness under races).
    pub async fn start(
        &self,
        request: &TransferRequest,
        to_branch: &str,
        requested_by: &str,
        notes: Option<&str>,
    ) -> EngineResult<StockTransfer> {
        let products = self.db.products();

        // Only a genuinely missing row becomes a business error; a store
        // failure stays a store failure
        let product = match products.get_by_id(&request.product_id).await {
            Ok(product) => product,
            Err(DbError::NotFound { .. }) => {
                return Err(CoreError::ProductNotFound(request.product_id.clone()).into())
            }
            Err(err) => return Err(err.into()),
        };

        validate_start(&product, request.qty, to_branch)?;

        let transfer = StockTransfer::in_transit(
            &product,
            request.qty,
            to_branch,
            requested_by,
            notes,
            Utc::now(),
        );

        if !self.db.transfers().create_in_transit(&transfer).await? {
            // A racing mutation consumed the stock after validation
            let fresh = products.get_by_id(&request.product_id).await?;
            return Err(CoreError::InsufficientStock {
                product: fresh.name,
                branch: fresh.branch,
                available: fresh.stock,
                requested: request.qty,
            }
            .into());
        }

        Ok(transfer)
    }

    /// Ships several products to the same destination in one sweep.
    ///
    /// Lines are processed sequentially and fail independently: an
    /// insufficient-stock line is reported and the loop moves on.
    /// Successful lines stay shipped regardless of later failures.
    pub async fn start_batch(
        &self,
        requests: &[TransferRequest],
        to_branch: &str,
        requested_by: &str,
        notes: Option<&str>,
    ) -> EngineResult<BatchOutcome<StockTransfer>> {
        let mut outcome = BatchOutcome::new();

        for request in requests {
            match self.start(request, to_branch, requested_by, notes).await {
                Ok(transfer) => outcome.succeeded.push(transfer),
                Err(err) => {
                    let (product_id, product_name) = match &err {
                        EngineError::Core(CoreError::InsufficientStock { product, .. }) => {
                            (request.product_id.clone(), product.clone())
                        }
                        _ => (request.product_id.clone(), String::new()),
                    };
                    warn!(
                        product_id = %product_id,
                        error = %err,
                        "Batch shipment line failed"
                    );
                    outcome.failed.push(BatchFailure {
                        product_id,
                        product_name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            to = %to_branch,
            shipped = outcome.succeeded_count(),
            failed = outcome.failed_count(),
            "Batch shipment finished"
        );
        Ok(outcome)
    }

    /// Finalizes an in-transit transfer with the given action.
    ///
    /// - `Receive` credits the destination branch row (cloning it from
    ///   the source catalog data on first arrival)
    /// - `Cancel` restores the source branch stock
    ///
    /// A transfer already in a terminal state yields `AlreadyFinalized`.
    pub async fn finalize(
        &self,
        transfer_id: &str,
        action: TransferAction,
        actor: &str,
    ) -> EngineResult<StockTransfer> {
        let transfers = self.db.transfers();

        let mut transfer = match transfers.get_by_id(transfer_id).await {
            Ok(transfer) => transfer,
            Err(DbError::NotFound { .. }) => {
                return Err(CoreError::TransferNotFound(transfer_id.to_string()).into())
            }
            Err(err) => return Err(err.into()),
        };

        let applied = match action {
            TransferAction::Receive => {
                transfer.receive(actor, Utc::now())?;
                // Source row feeds the destination clone; only its genuine
                // deletion after shipment falls back to the frozen snapshot
                // fields - any other store error propagates untouched
                match self.db.products().get_by_id(&transfer.product_id).await {
                    Ok(source) => transfers.receive(&transfer, &source).await?,
                    Err(DbError::NotFound { .. }) => {
                        let placeholder = placeholder_source(&transfer);
                        transfers.receive(&transfer, &placeholder).await?
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            TransferAction::Cancel => {
                transfer.cancel()?;
                transfers.cancel(&transfer).await?
            }
        };

        if !applied {
            // Lost the race against another finalizer
            let current = transfers.get_by_id(transfer_id).await?;
            return Err(CoreError::AlreadyFinalized {
                transfer_id: transfer_id.to_string(),
                status: current.status,
            }
            .into());
        }

        Ok(transfer)
    }

    /// Lists recent transfers visible to a branch scope, newest first.
    pub async fn list(
        &self,
        scope: &BranchScope,
        status: Option<TransferStatus>,
        limit: i64,
    ) -> EngineResult<Vec<StockTransfer>> {
        Ok(self.db.transfers().list_recent(scope, status, limit).await?)
    }
}

/// Minimal catalog data for the destination clone when the source row
/// was deleted between shipment and receipt. The frozen snapshot fields
/// on the transfer are all that is left to go on.
fn placeholder_source(transfer: &StockTransfer) -> bodega_core::Product {
    bodega_core::Product {
        id: transfer.product_id.clone(),
        code: transfer.product_code.clone(),
        name: transfer.product_name.clone(),
        brand: None,
        category: None,
        branch: transfer.from_branch.clone(),
        stock: 0,
        min_stock: bodega_core::DEFAULT_MIN_STOCK,
        buy_price: rust_decimal::Decimal::ZERO,
        price: rust_decimal::Decimal::ZERO,
        purchase_vat: Default::default(),
        sales_vat: Default::default(),
        purchase_vat_included: false,
        sales_vat_included: false,
        currency: "TRY".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::test_support::sample_product;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn request(product: &bodega_core::Product, qty: i64) -> TransferRequest {
        TransferRequest {
            product_id: product.id.clone(),
            qty,
        }
    }

    #[tokio::test]
    async fn test_start_and_receive_moves_stock() {
        let db = test_db().await;
        let engine = TransferEngine::new(db.clone());

        let source = sample_product("PNT-001", "Merkez", 10);
        let dest = sample_product("PNT-001", "Kadıköy", 1);
        db.products().insert(&source).await.unwrap();
        db.products().insert(&dest).await.unwrap();

        let transfer = engine
            .start(&request(&source, 4), "Kadıköy", "ayse", Some("weekly restock"))
            .await
            .unwrap();
        assert_eq!(transfer.status, TransferStatus::InTransit);
        assert_eq!(db.products().get_by_id(&source.id).await.unwrap().stock, 6);

        let received = engine
            .finalize(&transfer.id, TransferAction::Receive, "mehmet")
            .await
            .unwrap();
        assert_eq!(received.status, TransferStatus::Received);
        assert_eq!(db.products().get_by_id(&dest.id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_start_rejects_insufficient_stock() {
        let db = test_db().await;
        let engine = TransferEngine::new(db.clone());

        let source = sample_product("PNT-001", "Merkez", 3);
        db.products().insert(&source).await.unwrap();

        let err = engine
            .start(&request(&source, 5), "Kadıköy", "ayse", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InsufficientStock { available: 3, requested: 5, .. })
        ));
        assert_eq!(db.products().get_by_id(&source.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_start_rejects_same_branch_and_missing_product() {
        let db = test_db().await;
        let engine = TransferEngine::new(db.clone());

        let source = sample_product("PNT-001", "Merkez", 10);
        db.products().insert(&source).await.unwrap();

        let err = engine
            .start(&request(&source, 2), "Merkez", "ayse", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::SameBranch { .. })));

        let missing = TransferRequest {
            product_id: "ghost".to_string(),
            qty: 1,
        };
        let err = engine.start(&missing, "Kadıköy", "ayse", None).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_a_business_error() {
        let db = test_db().await;
        let engine = TransferEngine::new(db.clone());

        let source = sample_product("PNT-001", "Merkez", 10);
        db.products().insert(&source).await.unwrap();
        let transfer = engine
            .start(&request(&source, 2), "Kadıköy", "ayse", None)
            .await
            .unwrap();

        // The product and transfer exist; only the store is down. That
        // must surface as a store failure, never as "not found"
        db.close().await;

        let err = engine
            .start(&request(&source, 1), "Kadıköy", "ayse", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Db(_)), "got {err:?}");

        let err = engine
            .finalize(&transfer.id, TransferAction::Receive, "mehmet")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Db(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_cancel_restores_source_stock() {
        let db = test_db().await;
        let engine = TransferEngine::new(db.clone());

        let source = sample_product("PNT-001", "Merkez", 10);
        db.products().insert(&source).await.unwrap();

        let transfer = engine
            .start(&request(&source, 4), "Kadıköy", "ayse", None)
            .await
            .unwrap();
        let cancelled = engine
            .finalize(&transfer.id, TransferAction::Cancel, "ayse")
            .await
            .unwrap();

        assert_eq!(cancelled.status, TransferStatus::Cancelled);
        assert_eq!(db.products().get_by_id(&source.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_finalize_twice_is_already_finalized() {
        let db = test_db().await;
        let engine = TransferEngine::new(db.clone());

        let source = sample_product("PNT-001", "Merkez", 10);
        db.products().insert(&source).await.unwrap();

        let transfer = engine
            .start(&request(&source, 4), "Kadıköy", "ayse", None)
            .await
            .unwrap();
        engine
            .finalize(&transfer.id, TransferAction::Receive, "mehmet")
            .await
            .unwrap();

        let err = engine
            .finalize(&transfer.id, TransferAction::Cancel, "ayse")
            .await
            .unwrap_err();
        match err {
            EngineError::Core(CoreError::AlreadyFinalized { status, .. }) => {
                assert_eq!(status, TransferStatus::Received);
            }
            other => panic!("expected AlreadyFinalized, got {other:?}"),
        }

        // Neither stock side moved again
        assert_eq!(db.products().get_by_id(&source.id).await.unwrap().stock, 6);
    }

    #[tokio::test]
    async fn test_batch_partial_success() {
        let db = test_db().await;
        let engine = TransferEngine::new(db.clone());

        let paint = sample_product("PNT-001", "Merkez", 10);
        let brush = sample_product("BRS-001", "Merkez", 2);
        let tape = sample_product("TAP-001", "Merkez", 6);
        db.products().insert(&paint).await.unwrap();
        db.products().insert(&brush).await.unwrap();
        db.products().insert(&tape).await.unwrap();

        // Middle line fails; the lines before AND after it still commit
        let outcome = engine
            .start_batch(
                &[request(&paint, 4), request(&brush, 5), request(&tape, 3)],
                "Kadıköy",
                "ayse",
                None,
            )
            .await
            .unwrap();

        assert!(outcome.is_partial());
        assert_eq!(outcome.succeeded_count(), 2);
        assert_eq!(outcome.failed_count(), 1);
        assert_eq!(outcome.failed[0].product_id, brush.id);
        assert!(outcome.failed[0].reason.contains("Insufficient stock"));

        assert_eq!(db.products().get_by_id(&paint.id).await.unwrap().stock, 6);
        assert_eq!(db.products().get_by_id(&brush.id).await.unwrap().stock, 2);
        assert_eq!(db.products().get_by_id(&tape.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_list_scoped() {
        let db = test_db().await;
        let engine = TransferEngine::new(db.clone());

        let source = sample_product("PNT-001", "Merkez", 10);
        db.products().insert(&source).await.unwrap();
        engine
            .start(&request(&source, 2), "Kadıköy", "ayse", None)
            .await
            .unwrap();

        let all = engine.list(&BranchScope::All, None, 20).await.unwrap();
        assert_eq!(all.len(), 1);

        let elsewhere = engine
            .list(&BranchScope::Branch("Bornova".to_string()), None, 20)
            .await
            .unwrap();
        assert!(elsewhere.is_empty());
    }
}
