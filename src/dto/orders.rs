use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, OrderLine, OrderStatus};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub tax: i64,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithLines {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// Deserializing into `OrderStatus` rejects unknown values at the boundary.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}
