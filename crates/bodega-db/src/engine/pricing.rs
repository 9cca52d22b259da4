//! # Pricing Engine
//!
//! Persists bulk price adjustments and computes stock valuation.
//!
//! The adjustment arithmetic itself is pure (see
//! [`bodega_core::pricing`]); this engine owns the explicit save step
//! and the read side of valuation.

use tracing::{info, warn};

use bodega_core::{
    BatchFailure, BatchOutcome, BranchScope, PendingChanges, Product, ValuationTotals,
};

use crate::engine::EngineResult;
use crate::pool::Database;

/// Engine for bulk price saves and valuation reads.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    db: Database,
}

impl PricingEngine {
    /// Creates a new pricing engine over a database handle.
    pub fn new(db: Database) -> Self {
        PricingEngine { db }
    }

    /// Persists a pending-change map built by the bulk adjuster.
    ///
    /// One guarded write per product, sequential, independently failing.
    /// Saved prices stay saved when a later line fails; the outcome
    /// names the failures for retry.
    pub async fn save_pending(
        &self,
        products: &[Product],
        pending: &PendingChanges,
    ) -> EngineResult<BatchOutcome<String>> {
        let repo = self.db.products();
        let mut outcome = BatchOutcome::new();

        for (product_id, prices) in pending {
            let product_name = products
                .iter()
                .find(|p| &p.id == product_id)
                .map(|p| p.name.clone())
                .unwrap_or_default();

            match repo
                .set_prices(product_id, prices.buy_price, prices.price)
                .await
            {
                Ok(true) => outcome.succeeded.push(product_id.clone()),
                Ok(false) => {
                    warn!(product_id = %product_id, "Price save skipped: product gone");
                    outcome.failed.push(BatchFailure {
                        product_id: product_id.clone(),
                        product_name,
                        reason: "Product no longer exists".to_string(),
                    });
                }
                Err(err) => {
                    warn!(product_id = %product_id, error = %err, "Price save failed");
                    outcome.failed.push(BatchFailure {
                        product_id: product_id.clone(),
                        product_name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            saved = outcome.succeeded_count(),
            failed = outcome.failed_count(),
            "Bulk price save finished"
        );
        Ok(outcome)
    }

    /// Aggregated four-leg stock valuation over a branch scope, with the
    /// totals rounded once at the end.
    pub async fn valuation(&self, scope: &BranchScope) -> EngineResult<ValuationTotals> {
        let products = self.db.products().list(scope).await?;
        Ok(ValuationTotals::for_products(&products)?.rounded())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
