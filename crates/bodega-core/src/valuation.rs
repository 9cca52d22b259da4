//! # Valuation Calculator
//!
//! Pure VAT arithmetic and stock valuation aggregates.
//!
//! ## The One Numeric Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Every price in the system is stored EITHER net or gross of VAT,    │
//! │  flagged per field (`purchase_vat_included` / `sales_vat_included`).│
//! │                                                                     │
//! │  included = true   inclusive = price                                │
//! │                    exclusive = price / (1 + rate/100)               │
//! │                                                                     │
//! │  included = false  exclusive = price                                │
//! │                    inclusive = price * (1 + rate/100)               │
//! │                                                                     │
//! │  Full precision is preserved through every intermediate step.       │
//! │  2-decimal rounding happens exactly once, at the display boundary   │
//! │  or at the bulk-pricing commit (see crate::pricing), never here.    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The transfer engine, the audit engine and the bulk adjuster all consume
//! these functions, so the three flows cannot disagree on rounding or VAT
//! direction.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::types::{Product, VatRate};
use crate::validation::validate_price;

// =============================================================================
// Display Rounding
// =============================================================================

/// Rounds a monetary value to 2 decimal places, half away from zero.
///
/// This is the single rounding rule of the system. It is applied at
/// display boundaries and once per bulk-pricing write, never inside the
/// valuation arithmetic itself.
#[inline]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// =============================================================================
// Price Breakdown
// =============================================================================

/// A price expressed both net and gross of VAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Price without the VAT component.
    pub exclusive: Decimal,
    /// Price with the VAT component.
    pub inclusive: Decimal,
}

impl PriceBreakdown {
    /// Derives both legs from a stored price, its VAT rate, and the
    /// inclusion flag.
    ///
    /// ## Errors
    /// Rejects negative prices. Negative rates are unrepresentable
    /// (`VatRate` wraps `u32`), so the divisor `1 + rate/100 >= 1` and
    /// division can never fail.
    pub fn from_price(price: Decimal, rate: VatRate, included: bool) -> CoreResult<Self> {
        validate_price("price", price)?;

        let factor = rate.factor();
        Ok(if included {
            PriceBreakdown {
                inclusive: price,
                exclusive: price / factor,
            }
        } else {
            PriceBreakdown {
                exclusive: price,
                inclusive: price * factor,
            }
        })
    }
}

// =============================================================================
// Valuation Totals
// =============================================================================

/// Aggregated stock valuation across a product set.
///
/// Each product contributes `stock × price` on all four legs, using its
/// own VAT rates and inclusion flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValuationTotals {
    pub buy_exclusive: Decimal,
    pub buy_inclusive: Decimal,
    pub sell_exclusive: Decimal,
    pub sell_inclusive: Decimal,
}

impl ValuationTotals {
    /// Computes the aggregate valuation of a product set at full
    /// precision.
    pub fn for_products(products: &[Product]) -> CoreResult<Self> {
        let mut totals = ValuationTotals::default();

        for product in products {
            let qty = Decimal::from(product.stock);

            let buy = PriceBreakdown::from_price(
                product.buy_price,
                product.purchase_vat,
                product.purchase_vat_included,
            )?;
            let sell = PriceBreakdown::from_price(
                product.price,
                product.sales_vat,
                product.sales_vat_included,
            )?;

            totals.buy_exclusive += buy.exclusive * qty;
            totals.buy_inclusive += buy.inclusive * qty;
            totals.sell_exclusive += sell.exclusive * qty;
            totals.sell_inclusive += sell.inclusive * qty;
        }

        Ok(totals)
    }

    /// Returns a copy rounded to 2 decimals for display.
    pub fn rounded(&self) -> Self {
        ValuationTotals {
            buy_exclusive: round2(self.buy_exclusive),
            buy_inclusive: round2(self.buy_inclusive),
            sell_exclusive: round2(self.sell_exclusive),
            sell_inclusive: round2(self.sell_inclusive),
        }
    }
}

// =============================================================================
// Merged Stock View
// =============================================================================

/// Sums one SKU's stock across every branch row in the set.
///
/// The result is a derived display value for the all-branch view; the
/// per-branch rows remain the ledger of truth and are never mutated
/// through this path.
pub fn merged_stock(products: &[Product], code: &str) -> i64 {
    products
        .iter()
        .filter(|p| p.code == code)
        .map(|p| p.stock)
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
