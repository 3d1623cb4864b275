use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::orders::OrderTotals, models::PaymentStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CardPaymentRequest {
    pub card_number: String,
}

/// Result of one payment attempt. A declined or errored attempt is a normal
/// outcome, not an HTTP error; the persisted row is the audit trail.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentOutcome {
    pub success: bool,
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    pub transaction_ref: Option<String>,
    pub message: String,
    pub order_total: Option<OrderTotals>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancellationOutcome {
    pub payment_id: Uuid,
    pub order_id: Uuid,
    pub message: String,
}
