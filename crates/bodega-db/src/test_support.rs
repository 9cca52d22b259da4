//! Shared fixtures for the store and engine tests.

use chrono::Utc;
use rust_decimal_macros::dec;
use uuid::Uuid;

use bodega_core::{Product, VatRate};

/// A catalog row with the standard test prices: buy 100 / sell 150, both
/// VAT-exclusive at 20%.
pub fn sample_product(code: &str, branch: &str, stock: i64) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4().to_string(),
        code: code.to_string(),
        name: format!("Product {code}"),
        brand: Some("Fixture".to_string()),
        category: Some("Test".to_string()),
        branch: branch.to_string(),
        stock,
        min_stock: 5,
        buy_price: dec!(100),
        price: dec!(150),
        purchase_vat: VatRate::from_percent(20),
        sales_vat: VatRate::from_percent(20),
        purchase_vat_included: false,
        sales_vat_included: false,
        currency: "TRY".to_string(),
        created_at: now,
        updated_at: now,
    }
}
