//! # Transfer Repository
//!
//! Persistence for inter-branch stock transfers.
//!
//! ## Transactional Shape
//! Creating or finalizing a transfer touches two tables (the transfer
//! record and a product stock row), so each of those methods runs one
//! SQLite transaction. The status guard (`WHERE status = 'IN_TRANSIT'`)
//! makes finalization first-writer-wins: a second receive or cancel on
//! the same record updates zero rows and the whole transaction rolls
//! back untouched.

use std::str::FromStr;

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use bodega_core::{BranchScope, Product, StockTransfer, TransferStatus};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Type
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct TransferRow {
    id: String,
    product_id: String,
    product_code: String,
    product_name: String,
    qty: i64,
    from_branch: String,
    to_branch: String,
    status: String,
    requested_by: String,
    received_by: Option<String>,
    notes: Option<String>,
    shipped_at: chrono::DateTime<chrono::Utc>,
    received_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<TransferRow> for StockTransfer {
    type Error = DbError;

    fn try_from(row: TransferRow) -> Result<Self, Self::Error> {
        let status = TransferStatus::from_str(&row.status)
            .map_err(|_| DbError::decode("status", &row.status))?;

        Ok(StockTransfer {
            id: row.id,
            product_id: row.product_id,
            product_code: row.product_code,
            product_name: row.product_name,
            qty: row.qty,
            from_branch: row.from_branch,
            to_branch: row.to_branch,
            status,
            requested_by: row.requested_by,
            received_by: row.received_by,
            notes: row.notes,
            shipped_at: row.shipped_at,
            received_at: row.received_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, product_id, product_code, product_name, qty, from_branch, \
     to_branch, status, requested_by, received_by, notes, shipped_at, received_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock transfer operations.
#[derive(Debug, Clone)]
pub struct TransferRepository {
    pool: SqlitePool,
}

impl TransferRepository {
    /// Creates a new transfer repository.
    pub fn new(pool: SqlitePool) -> Self {
        TransferRepository { pool }
    }

    /// Atomically debits the source branch and records the shipment.
    ///
    /// ## Returns
    /// - `Ok(true)`  - stock debited, transfer recorded
    /// - `Ok(false)` - the source row had less stock than `qty` (or was
    ///   deleted concurrently); nothing was written
    pub async fn create_in_transit(&self, transfer: &StockTransfer) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let debit = sqlx::query(
            "UPDATE products \
             SET stock = stock - ?2, updated_at = ?3 \
             WHERE id = ?1 AND stock >= ?2",
        )
        .bind(&transfer.product_id)
        .bind(transfer.qty)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await?;

        if debit.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO stock_transfers \
             (id, product_id, product_code, product_name, qty, from_branch, to_branch, \
              status, requested_by, received_by, notes, shipped_at, received_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&transfer.id)
        .bind(&transfer.product_id)
        .bind(&transfer.product_code)
        .bind(&transfer.product_name)
        .bind(transfer.qty)
        .bind(&transfer.from_branch)
        .bind(&transfer.to_branch)
        .bind(transfer.status.as_str())
        .bind(&transfer.requested_by)
        .bind(&transfer.received_by)
        .bind(&transfer.notes)
        .bind(transfer.shipped_at)
        .bind(transfer.received_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            transfer_id = %transfer.id,
            product = %transfer.product_code,
            qty = transfer.qty,
            from = %transfer.from_branch,
            to = %transfer.to_branch,
            "Transfer shipped"
        );
        Ok(true)
    }

    /// Fetches a transfer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<StockTransfer> {
        let row = sqlx::query_as::<_, TransferRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM stock_transfers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Transfer", id))?;

        row.try_into()
    }

    /// Marks a transfer received and credits the destination branch.
    ///
    /// The destination stock row is looked up by `(product_code,
    /// to_branch)`. If the SKU has never existed at the destination, a
    /// new row is cloned from the source product's catalog data with
    /// `stock = qty`.
    ///
    /// `transfer` must already carry the receive fields (status,
    /// received_by, received_at); this method persists them. The SQL
    /// status guard still protects against a concurrent finalizer.
    ///
    /// ## Returns
    /// `Ok(false)` when the record was no longer `IN_TRANSIT`.
    pub async fn receive(&self, transfer: &StockTransfer, source: &Product) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let finalized = sqlx::query(
            "UPDATE stock_transfers \
             SET status = ?2, received_by = ?3, received_at = ?4 \
             WHERE id = ?1 AND status = 'IN_TRANSIT'",
        )
        .bind(&transfer.id)
        .bind(TransferStatus::Received.as_str())
        .bind(&transfer.received_by)
        .bind(transfer.received_at)
        .execute(&mut *tx)
        .await?;

        if finalized.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let credited = sqlx::query(
            "UPDATE products \
             SET stock = stock + ?3, updated_at = ?4 \
             WHERE code = ?1 AND branch = ?2",
        )
        .bind(&transfer.product_code)
        .bind(&transfer.to_branch)
        .bind(transfer.qty)
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await?;

        if credited.rows_affected() == 0 {
            // First arrival of this SKU at the destination: clone the
            // catalog data from the source row
            let now = chrono::Utc::now();
            sqlx::query(
                "INSERT INTO products \
                 (id, code, name, brand, category, branch, stock, min_stock, \
                  buy_price, price, purchase_vat, sales_vat, \
                  purchase_vat_included, sales_vat_included, currency, \
                  created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&source.code)
            .bind(&source.name)
            .bind(&source.brand)
            .bind(&source.category)
            .bind(&transfer.to_branch)
            .bind(transfer.qty)
            .bind(source.min_stock)
            .bind(source.buy_price.to_string())
            .bind(source.price.to_string())
            .bind(source.purchase_vat.percent() as i64)
            .bind(source.sales_vat.percent() as i64)
            .bind(source.purchase_vat_included)
            .bind(source.sales_vat_included)
            .bind(&source.currency)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            debug!(
                code = %transfer.product_code,
                branch = %transfer.to_branch,
                "Destination stock row cloned from source"
            );
        }

        tx.commit().await?;

        info!(
            transfer_id = %transfer.id,
            product = %transfer.product_code,
            qty = transfer.qty,
            to = %transfer.to_branch,
            "Transfer received"
        );
        Ok(true)
    }

    /// Cancels an in-transit transfer and restores the source stock.
    ///
    /// If the source product row was deleted after shipment the
    /// restoration quietly touches nothing; the cancellation itself
    /// still commits.
    ///
    /// ## Returns
    /// `Ok(false)` when the record was no longer `IN_TRANSIT`.
    pub async fn cancel(&self, transfer: &StockTransfer) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let finalized = sqlx::query(
            "UPDATE stock_transfers \
             SET status = ?2 \
             WHERE id = ?1 AND status = 'IN_TRANSIT'",
        )
        .bind(&transfer.id)
        .bind(TransferStatus::Cancelled.as_str())
        .execute(&mut *tx)
        .await?;

        if finalized.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&transfer.product_id)
            .bind(transfer.qty)
            .bind(chrono::Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            transfer_id = %transfer.id,
            product = %transfer.product_code,
            qty = transfer.qty,
            from = %transfer.from_branch,
            "Transfer cancelled, source stock restored"
        );
        Ok(true)
    }

    /// Lists transfers newest-first, optionally filtered by status.
    ///
    /// A scoped caller sees a transfer when their branch is either
    /// endpoint.
    pub async fn list_recent(
        &self,
        scope: &BranchScope,
        status: Option<TransferStatus>,
        limit: i64,
    ) -> DbResult<Vec<StockTransfer>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM stock_transfers WHERE 1=1");
        if matches!(scope, BranchScope::Branch(_)) {
            sql.push_str(" AND (from_branch = ? OR to_branch = ?)");
        }
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY shipped_at DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, TransferRow>(&sql);
        if let BranchScope::Branch(branch) = scope {
            query = query.bind(branch.clone()).bind(branch.clone());
        }
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        query = query.bind(limit);

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(StockTransfer::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use crate::test_support::sample_product;
    use bodega_core::{BranchScope, StockTransfer, TransferStatus};
    use chrono::Utc;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn ship(product: &bodega_core::Product, qty: i64, to: &str) -> StockTransfer {
        StockTransfer::in_transit(product, qty, to, "ayse", None, Utc::now())
    }

    #[tokio::test]
    async fn test_create_debits_source() {
        let db = test_db().await;
        let products = db.products();
        let transfers = db.transfers();

        let product = sample_product("PNT-001", "Merkez", 10);
        products.insert(&product).await.unwrap();

        let transfer = ship(&product, 4, "Kadıköy");
        assert!(transfers.create_in_transit(&transfer).await.unwrap());

        assert_eq!(products.get_by_id(&product.id).await.unwrap().stock, 6);
        let loaded = transfers.get_by_id(&transfer.id).await.unwrap();
        assert_eq!(loaded.status, TransferStatus::InTransit);
        assert_eq!(loaded.qty, 4);
    }

    #[tokio::test]
    async fn test_create_insufficient_stock_writes_nothing() {
        let db = test_db().await;
        let products = db.products();
        let transfers = db.transfers();

        let product = sample_product("PNT-001", "Merkez", 3);
        products.insert(&product).await.unwrap();

        let transfer = ship(&product, 5, "Kadıköy");
        assert!(!transfers.create_in_transit(&transfer).await.unwrap());

        // Stock untouched, no transfer record
        assert_eq!(products.get_by_id(&product.id).await.unwrap().stock, 3);
        assert!(transfers.get_by_id(&transfer.id).await.is_err());
    }

    #[tokio::test]
    async fn test_receive_credits_existing_destination() {
        let db = test_db().await;
        let products = db.products();
        let transfers = db.transfers();

        let source = sample_product("PNT-001", "Merkez", 10);
        let dest = sample_product("PNT-001", "Kadıköy", 2);
        products.insert(&source).await.unwrap();
        products.insert(&dest).await.unwrap();

        let mut transfer = ship(&source, 4, "Kadıköy");
        transfers.create_in_transit(&transfer).await.unwrap();

        transfer.receive("mehmet", Utc::now()).unwrap();
        assert!(transfers.receive(&transfer, &source).await.unwrap());

        assert_eq!(products.get_by_id(&dest.id).await.unwrap().stock, 6);
        let loaded = transfers.get_by_id(&transfer.id).await.unwrap();
        assert_eq!(loaded.status, TransferStatus::Received);
        assert_eq!(loaded.received_by.as_deref(), Some("mehmet"));
        assert!(loaded.received_at.is_some());
    }

    #[tokio::test]
    async fn test_receive_clones_missing_destination() {
        let db = test_db().await;
        let products = db.products();
        let transfers = db.transfers();

        let source = sample_product("PNT-001", "Merkez", 10);
        products.insert(&source).await.unwrap();

        let mut transfer = ship(&source, 4, "Kadıköy");
        transfers.create_in_transit(&transfer).await.unwrap();
        transfer.receive("mehmet", Utc::now()).unwrap();
        assert!(transfers.receive(&transfer, &source).await.unwrap());

        let cloned = products
            .find_by_code_and_branch("PNT-001", "Kadıköy")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cloned.stock, 4);
        assert_eq!(cloned.name, source.name);
        assert_eq!(cloned.buy_price, source.buy_price);
        assert_ne!(cloned.id, source.id);
    }

    #[tokio::test]
    async fn test_cancel_restores_source() {
        let db = test_db().await;
        let products = db.products();
        let transfers = db.transfers();

        let source = sample_product("PNT-001", "Merkez", 10);
        products.insert(&source).await.unwrap();

        let mut transfer = ship(&source, 4, "Kadıköy");
        transfers.create_in_transit(&transfer).await.unwrap();
        assert_eq!(products.get_by_id(&source.id).await.unwrap().stock, 6);

        transfer.cancel().unwrap();
        assert!(transfers.cancel(&transfer).await.unwrap());

        assert_eq!(products.get_by_id(&source.id).await.unwrap().stock, 10);
        assert_eq!(
            transfers.get_by_id(&transfer.id).await.unwrap().status,
            TransferStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_second_finalize_is_rejected_by_status_guard() {
        let db = test_db().await;
        let products = db.products();
        let transfers = db.transfers();

        let source = sample_product("PNT-001", "Merkez", 10);
        products.insert(&source).await.unwrap();

        let mut transfer = ship(&source, 4, "Kadıköy");
        transfers.create_in_transit(&transfer).await.unwrap();
        transfer.receive("mehmet", Utc::now()).unwrap();
        assert!(transfers.receive(&transfer, &source).await.unwrap());

        // Cancelling an already-received record changes nothing
        assert!(!transfers.cancel(&transfer).await.unwrap());
        assert_eq!(products.get_by_id(&source.id).await.unwrap().stock, 6);
        let dest = products
            .find_by_code_and_branch("PNT-001", "Kadıköy")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dest.stock, 4);
    }

    #[tokio::test]
    async fn test_list_recent_scope_and_order() {
        let db = test_db().await;
        let products = db.products();
        let transfers = db.transfers();

        let a = sample_product("PNT-001", "Merkez", 20);
        let b = sample_product("PNT-002", "Bornova", 20);
        products.insert(&a).await.unwrap();
        products.insert(&b).await.unwrap();

        let older = StockTransfer::in_transit(
            &a,
            1,
            "Kadıköy",
            "ayse",
            None,
            Utc::now() - chrono::Duration::hours(2),
        );
        let newer = StockTransfer::in_transit(&b, 1, "Merkez", "ayse", None, Utc::now());
        transfers.create_in_transit(&older).await.unwrap();
        transfers.create_in_transit(&newer).await.unwrap();

        let all = transfers
            .list_recent(&BranchScope::All, None, 50)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, newer.id);

        // Kadıköy only sees the transfer it is an endpoint of
        let scoped = transfers
            .list_recent(&BranchScope::Branch("Kadıköy".to_string()), None, 50)
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id, older.id);

        let in_transit = transfers
            .list_recent(&BranchScope::All, Some(TransferStatus::InTransit), 50)
            .await
            .unwrap();
        assert_eq!(in_transit.len(), 2);
    }
}
