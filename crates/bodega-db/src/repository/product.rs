//! # Product Repository
//!
//! Catalog and per-branch stock ledger access.
//!
//! ## Stock Mutations
//! Stock and price writes are single-row UPDATEs returning
//! `DbResult<bool>`: `false` means the row was missing and nothing
//! changed. The guarded transfer debit (`WHERE stock >= qty`) lives
//! with its transaction in the transfer repository; there is no
//! read-then-write gap to race through.

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::debug;

use bodega_core::{BranchScope, Product, VatRate};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Type
// =============================================================================

/// Raw `products` row. Prices are TEXT decimals, VAT flags are 0/1
/// integers; [`TryFrom`] does the lifting into [`Product`].
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    code: String,
    name: String,
    brand: Option<String>,
    category: Option<String>,
    branch: String,
    stock: i64,
    min_stock: i64,
    buy_price: String,
    price: String,
    purchase_vat: i64,
    sales_vat: i64,
    purchase_vat_included: bool,
    sales_vat_included: bool,
    currency: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let buy_price = Decimal::from_str(&row.buy_price)
            .map_err(|_| DbError::decode("buy_price", &row.buy_price))?;
        let price =
            Decimal::from_str(&row.price).map_err(|_| DbError::decode("price", &row.price))?;
        let purchase_vat = u32::try_from(row.purchase_vat)
            .map_err(|_| DbError::decode("purchase_vat", row.purchase_vat.to_string()))?;
        let sales_vat = u32::try_from(row.sales_vat)
            .map_err(|_| DbError::decode("sales_vat", row.sales_vat.to_string()))?;

        Ok(Product {
            id: row.id,
            code: row.code,
            name: row.name,
            brand: row.brand,
            category: row.category,
            branch: row.branch,
            stock: row.stock,
            min_stock: row.min_stock,
            buy_price,
            price,
            purchase_vat: VatRate::from_percent(purchase_vat),
            sales_vat: VatRate::from_percent(sales_vat),
            purchase_vat_included: row.purchase_vat_included,
            sales_vat_included: row.sales_vat_included,
            currency: row.currency,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, code, name, brand, category, branch, stock, min_stock, \
     buy_price, price, purchase_vat, sales_vat, purchase_vat_included, sales_vat_included, \
     currency, created_at, updated_at";

// =============================================================================
// Repository
// =============================================================================

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new product repository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product row.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO products \
             (id, code, name, brand, category, branch, stock, min_stock, \
              buy_price, price, purchase_vat, sales_vat, \
              purchase_vat_included, sales_vat_included, currency, \
              created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.branch)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.buy_price.to_string())
        .bind(product.price.to_string())
        .bind(product.purchase_vat.percent() as i64)
        .bind(product.sales_vat.percent() as i64)
        .bind(product.purchase_vat_included)
        .bind(product.sales_vat_included)
        .bind(&product.currency)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %product.id, code = %product.code, branch = %product.branch, "Product inserted");
        Ok(())
    }

    /// Fetches a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))?;

        row.try_into()
    }

    /// Finds the stock row for a SKU at one branch, if it exists.
    ///
    /// Used by transfer receive to locate (or decide to clone) the
    /// destination row.
    pub async fn find_by_code_and_branch(
        &self,
        code: &str,
        branch: &str,
    ) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM products WHERE code = ?1 AND branch = ?2"
        ))
        .bind(code)
        .bind(branch)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Lists products inside a branch scope, ordered by name.
    pub async fn list(&self, scope: &BranchScope) -> DbResult<Vec<Product>> {
        let rows = match scope {
            BranchScope::All => {
                sqlx::query_as::<_, ProductRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM products ORDER BY name"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            BranchScope::Branch(branch) => {
                sqlx::query_as::<_, ProductRow>(&format!(
                    "SELECT {SELECT_COLUMNS} FROM products WHERE branch = ?1 ORDER BY name"
                ))
                .bind(branch)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Overwrites the stock level with an absolute quantity.
    ///
    /// Used by audit commit: the counted quantity becomes the new truth.
    /// Negative quantities are rejected by the schema CHECK; callers
    /// validate before reaching here.
    pub async fn set_stock(&self, id: &str, qty: i64) -> DbResult<bool> {
        let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(qty)
            .bind(chrono::Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Writes both prices in one statement.
    ///
    /// Used by the bulk pricing save loop: one row per item so partial
    /// completion stays visible.
    pub async fn set_prices(&self, id: &str, buy_price: Decimal, price: Decimal) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET buy_price = ?2, price = ?3, updated_at = ?4 WHERE id = ?1",
        )
        .bind(id)
        .bind(buy_price.to_string())
        .bind(price.to_string())
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
