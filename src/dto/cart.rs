use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub item_id: Uuid,
    pub quantity: i32,
}

/// Cart line joined with the item's current price and tax, plus the derived
/// line amounts. Amounts are minor units.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineView {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub unit_tax: i64,
    pub line_subtotal: i64,
    pub line_tax: i64,
    pub stock: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartTotals {
    pub subtotal: i64,
    pub tax: i64,
    pub total: i64,
    pub item_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartContents {
    pub lines: Vec<CartLineView>,
    pub totals: CartTotals,
}
