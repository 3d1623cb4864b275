use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::payments::CancellationOutcome,
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders},
        payments::{ActiveModel as PaymentActive, Entity as Payments},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{OrderStatus, PaymentStatus},
    response::{ApiResponse, Meta},
    services::{inventory_service, order_service},
    state::AppState,
};

const CANCELLED_MESSAGE: &str = "Transaction cancelled by customer";

/// Reverse a pending payment attempt: mark the payment and its order
/// CANCELLED and give back every order line's reserved stock, all in one
/// transaction. Resolved payments (APPROVED, DECLINED, already CANCELLED)
/// are rejected; in practice only the ERROR row from a malformed card
/// qualifies.
pub async fn cancel_transaction(
    state: &AppState,
    user: &AuthUser,
    payment_id: Uuid,
) -> AppResult<ApiResponse<CancellationOutcome>> {
    let txn = state.orm.begin().await?;

    let payment = Payments::find_by_id(payment_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = Orders::find_by_id(payment.order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.customer_id != user.customer_id {
        return Err(AppError::Forbidden);
    }
    if !payment.status.is_cancellable() {
        return Err(AppError::Conflict(
            "This transaction cannot be cancelled".into(),
        ));
    }

    let order_id = order.id;

    let mut payment_active: PaymentActive = payment.into();
    payment_active.status = Set(PaymentStatus::Cancelled);
    payment_active.message = Set(CANCELLED_MESSAGE.to_string());
    payment_active.update(&txn).await?;

    let mut order_active: OrderActive = order.into();
    order_active.status = Set(OrderStatus::Cancelled);
    order_active.updated_at = Set(Utc::now().into());
    order_active.update(&txn).await?;

    // One release per line, exactly the quantities consumed at checkout.
    let lines = order_service::order_lines_for_update(&txn, order_id).await?;
    for line in &lines {
        inventory_service::release(&txn, line.item_id, line.quantity).await?;
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        state,
        Some(user.customer_id),
        "payment_cancel",
        Some("payments"),
        Some(serde_json::json!({ "payment_id": payment_id, "order_id": order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Transaction has been cancelled",
        CancellationOutcome {
            payment_id,
            order_id,
            message: CANCELLED_MESSAGE.to_string(),
        },
        Some(Meta::empty()),
    ))
}
