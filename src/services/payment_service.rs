use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::LockType;
use sea_orm::{ActiveModelTrait, EntityTrait, QuerySelect, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::payments::{CardPaymentRequest, PaymentOutcome},
    entity::{
        orders::{ActiveModel as OrderActive, Entity as Orders},
        payments::{ActiveModel as PaymentActive, Model as PaymentModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{OrderStatus, PaymentStatus},
    response::{ApiResponse, Meta},
    services::order_service,
    state::AppState,
};

const INVALID_CARD_MESSAGE: &str = "Invalid card number – please retry";
const DECLINED_MESSAGE: &str = "Transaction Declined – please try another card";

/// Simulation boundary standing in for a payment gateway. The default
/// implementation is an unbiased coin flip; tests supply deterministic ones.
pub trait BankAuthorizer: Send + Sync {
    /// `amount` is the order total in minor units.
    fn authorize(&self, amount: i64) -> bool;
}

pub struct CoinFlipAuthorizer;

impl BankAuthorizer for CoinFlipAuthorizer {
    fn authorize(&self, _amount: i64) -> bool {
        rand::random()
    }
}

/// Run one card-payment attempt against a PENDING order owned by the caller.
///
/// Exactly one payment row is persisted per invocation: ERROR for a
/// malformed card number, APPROVED or DECLINED after simulated
/// authorization. Approval also moves the order to PAID; a decline leaves it
/// PENDING and retry-eligible.
pub async fn process_card_payment(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: CardPaymentRequest,
) -> AppResult<ApiResponse<PaymentOutcome>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.customer_id != user.customer_id {
        return Err(AppError::Forbidden);
    }
    if order.status != OrderStatus::Pending {
        return Err(AppError::Conflict(format!(
            "Order cannot be paid (status: {})",
            order.status.as_str()
        )));
    }

    let digits = normalize_card_number(&payload.card_number);

    let outcome = if !card_length_ok(&digits) || !luhn_valid(&digits) {
        // The malformed attempt is still recorded; this row is the only
        // payment state that remains cancellable.
        let payment = insert_payment(
            &txn,
            order.id,
            None,
            None,
            PaymentStatus::Error,
            INVALID_CARD_MESSAGE,
        )
        .await?;
        txn.commit().await?;

        PaymentOutcome {
            success: false,
            payment_id: payment.id,
            status: PaymentStatus::Error,
            transaction_ref: None,
            message: INVALID_CARD_MESSAGE.to_string(),
            order_total: None,
        }
    } else {
        let lines: Vec<_> = order_service::order_lines(&txn, order.id)
            .await?
            .into_iter()
            .map(order_service::order_line_from_entity)
            .collect();
        let totals = order_service::totals_from_lines(&lines);

        let approved = state.authorizer.authorize(totals.total);
        let last4 = digits[digits.len() - 4..].to_string();

        if approved {
            let transaction_ref = build_transaction_ref();
            let message = format!("Transaction Approved – to card ending {last4}");

            let mut active: OrderActive = order.into();
            active.status = Set(OrderStatus::Paid);
            active.updated_at = Set(Utc::now().into());
            let order = active.update(&txn).await?;

            let payment = insert_payment(
                &txn,
                order.id,
                Some(transaction_ref.clone()),
                Some(last4),
                PaymentStatus::Approved,
                &message,
            )
            .await?;
            txn.commit().await?;

            PaymentOutcome {
                success: true,
                payment_id: payment.id,
                status: PaymentStatus::Approved,
                transaction_ref: Some(transaction_ref),
                message,
                order_total: Some(totals),
            }
        } else {
            let payment = insert_payment(
                &txn,
                order.id,
                None,
                Some(last4),
                PaymentStatus::Declined,
                DECLINED_MESSAGE,
            )
            .await?;
            txn.commit().await?;

            PaymentOutcome {
                success: false,
                payment_id: payment.id,
                status: PaymentStatus::Declined,
                transaction_ref: None,
                message: DECLINED_MESSAGE.to_string(),
                order_total: None,
            }
        }
    };

    if let Err(err) = log_audit(
        state,
        Some(user.customer_id),
        "payment_attempt",
        Some("payments"),
        Some(serde_json::json!({
            "order_id": order_id,
            "payment_id": outcome.payment_id,
            "status": outcome.status.as_str(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let message = outcome.message.clone();
    Ok(ApiResponse::success(message, outcome, Some(Meta::empty())))
}

async fn insert_payment<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    transaction_ref: Option<String>,
    card_last4: Option<String>,
    status: PaymentStatus,
    message: &str,
) -> AppResult<PaymentModel> {
    Ok(PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        transaction_ref: Set(transaction_ref),
        card_last4: Set(card_last4),
        status: Set(status),
        message: Set(message.to_string()),
        created_at: NotSet,
    }
    .insert(conn)
    .await?)
}

pub fn normalize_card_number(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn card_length_ok(digits: &str) -> bool {
    (13..=19).contains(&digits.len())
}

/// Luhn checksum: double every second digit from the right, sum the digit
/// sums, valid iff the total is divisible by 10.
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() {
        return false;
    }
    let mut sum = 0u32;
    for (i, ch) in digits.chars().rev().enumerate() {
        let Some(mut digit) = ch.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

fn build_transaction_ref() -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = Uuid::new_v4().to_string();
    let short = &suffix[..8];
    format!("TXN-{}-{}", date, short)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luhn_accepts_valid_card() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("4242424242424242"));
    }

    #[test]
    fn luhn_rejects_bad_checksum() {
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid(""));
    }

    #[test]
    fn normalization_strips_non_digits() {
        assert_eq!(
            normalize_card_number("4111-1111 1111.1111"),
            "4111111111111111"
        );
    }

    #[test]
    fn length_gate_is_13_to_19_digits() {
        assert!(!card_length_ok("411111111111")); // 12
        assert!(card_length_ok("4111111111111")); // 13
        assert!(card_length_ok("4111111111111111111")); // 19
        assert!(!card_length_ok("41111111111111111111")); // 20
    }

    #[test]
    fn transaction_ref_has_expected_shape() {
        let txn_ref = build_transaction_ref();
        assert!(txn_ref.starts_with("TXN-"));
        assert_eq!(txn_ref.len(), "TXN-".len() + 8 + 1 + 8);
    }
}
