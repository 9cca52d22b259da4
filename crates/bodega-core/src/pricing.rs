//! # Bulk Price Adjuster
//!
//! Rule-based adjustment of buy/sell prices over a working set.
//!
//! ## Preview-Before-Commit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 Bulk Pricing Wizard Flow                            │
//! │                                                                     │
//! │  Select products ──► apply_rule() ──► PendingChanges (in memory)    │
//! │                           │                     │                    │
//! │          (may run again)  └──── compounds ──────┘                    │
//! │                                                 │                    │
//! │                                                 ▼                    │
//! │                                  explicit save (PricingEngine)       │
//! │                                  one atomic set_prices per product   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The adjuster never writes to the catalog. It only builds/updates the
//! pending-change map; persisting it is a separate explicit step.
//!
//! ## Rounding
//! `round2` is applied exactly once, at the moment a value is written into
//! the pending map. A second invocation therefore compounds on the
//! already-rounded value - deliberately, matching a wizard that can be run
//! several times before the final save.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Product;
use crate::valuation::round2;

// =============================================================================
// Rule Types
// =============================================================================

/// How the rule value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustKind {
    /// `value` is a percentage of the current price.
    Percent,
    /// `value` is a fixed amount added to the current price.
    Amount,
}

/// Which price field(s) the rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustTarget {
    Buy,
    Sell,
    /// Applies the formula independently to each field against that
    /// field's own current value - never a shared delta.
    Both,
}

/// An ephemeral bulk price adjustment rule. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkPriceRule {
    pub kind: AdjustKind,
    pub target: AdjustTarget,
    /// Signed: negative values discount, positive values raise.
    pub value: Decimal,
}

// =============================================================================
// Pending Changes
// =============================================================================

/// Working copy of one product's prices inside the pending map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPrices {
    pub buy_price: Decimal,
    pub price: Decimal,
}

impl PendingPrices {
    /// Seeds a working copy from the catalog row.
    pub fn from_product(product: &Product) -> Self {
        PendingPrices {
            buy_price: product.buy_price,
            price: product.price,
        }
    }
}

/// productId → pending prices. BTreeMap keeps the save loop deterministic.
pub type PendingChanges = BTreeMap<String, PendingPrices>;

// =============================================================================
// Rule Application
// =============================================================================

/// Computes the delta for one field's current value under the rule.
fn delta_for(rule: &BulkPriceRule, current: Decimal) -> Decimal {
    match rule.kind {
        AdjustKind::Percent => current * rule.value / Decimal::from(100),
        AdjustKind::Amount => rule.value,
    }
}

/// Adjusted value: rounded once at the write, floored at zero so a heavy
/// discount can never produce a negative price.
fn adjusted(current: Decimal, delta: Decimal) -> Decimal {
    let next = round2(current + delta);
    if next.is_sign_negative() {
        Decimal::ZERO
    } else {
        next
    }
}

/// Applies a rule to a selection of products, updating the pending map.
///
/// For each product the current value is the pending entry if one exists,
/// otherwise the catalog value - so repeated invocations compound.
///
/// A no-op rule (`value == 0`) returns early without touching the map: no
/// mutation, no rounding artifacts.
pub fn apply_rule(products: &[Product], pending: &mut PendingChanges, rule: &BulkPriceRule) {
    if rule.value.is_zero() {
        return;
    }

    for product in products {
        let mut current = pending
            .get(&product.id)
            .copied()
            .unwrap_or_else(|| PendingPrices::from_product(product));

        if matches!(rule.target, AdjustTarget::Buy | AdjustTarget::Both) {
            current.buy_price = adjusted(current.buy_price, delta_for(rule, current.buy_price));
        }
        if matches!(rule.target, AdjustTarget::Sell | AdjustTarget::Both) {
            current.price = adjusted(current.price, delta_for(rule, current.price));
        }

        pending.insert(product.id.clone(), current);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
