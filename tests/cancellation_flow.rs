mod common;

use axum_storefront_api::{
    dto::{cart::AddToCartRequest, payments::CardPaymentRequest},
    error::AppError,
    models::{OrderStatus, PaymentStatus},
    services::{cancellation_service, cart_service, order_service, payment_service},
};
use common::{create_customer, create_item, item_stock, setup_state};
use uuid::Uuid;

#[tokio::test]
async fn cancelling_an_error_payment_restores_stock() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Canceller").await?;
    let item_id = create_item(&state, "Returnable", 1000, 100, 5).await?;

    cart_service::add_item(&state, &user, AddToCartRequest { item_id, quantity: 2 }).await?;
    let order = order_service::checkout(&state, &user).await?;
    let order_id = order.data.expect("checkout data").order.id;
    assert_eq!(item_stock(&state, item_id).await?, 3);

    // A malformed card leaves the only cancellable payment state.
    let attempt = payment_service::process_card_payment(
        &state,
        &user,
        order_id,
        CardPaymentRequest {
            card_number: "1234".into(),
        },
    )
    .await?;
    let payment_id = attempt.data.expect("outcome").payment_id;

    let resp = cancellation_service::cancel_transaction(&state, &user, payment_id).await?;
    let outcome = resp.data.expect("cancellation data");
    assert_eq!(outcome.order_id, order_id);

    // Exactly the reserved quantities come back; order and payment are
    // both CANCELLED.
    assert_eq!(item_stock(&state, item_id).await?, 5);

    let order = order_service::get_order(&state, &user, order_id).await?;
    assert_eq!(
        order.data.expect("order").order.status,
        OrderStatus::Cancelled
    );

    use axum_storefront_api::entity::payments::Entity as Payments;
    use sea_orm::EntityTrait;
    let payment = Payments::find_by_id(payment_id)
        .one(&state.orm)
        .await?
        .expect("payment row");
    assert_eq!(payment.status, PaymentStatus::Cancelled);

    Ok(())
}

#[tokio::test]
async fn approved_payment_cannot_be_cancelled() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Settled").await?;
    let item_id = create_item(&state, "Kept", 1000, 100, 5).await?;

    cart_service::add_item(&state, &user, AddToCartRequest { item_id, quantity: 2 }).await?;
    let order = order_service::checkout(&state, &user).await?;
    let order_id = order.data.expect("checkout data").order.id;

    let attempt = payment_service::process_card_payment(
        &state,
        &user,
        order_id,
        CardPaymentRequest {
            card_number: "4111111111111111".into(),
        },
    )
    .await?;
    let outcome = attempt.data.expect("outcome");
    assert_eq!(outcome.status, PaymentStatus::Approved);

    let err = cancellation_service::cancel_transaction(&state, &user, outcome.payment_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Nothing was compensated.
    assert_eq!(item_stock(&state, item_id).await?, 3);
    let order = order_service::get_order(&state, &user, order_id).await?;
    assert_eq!(order.data.expect("order").order.status, OrderStatus::Paid);

    Ok(())
}

#[tokio::test]
async fn cancelling_unknown_payment_is_not_found() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Lost").await?;

    let err = cancellation_service::cancel_transaction(&state, &user, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn cancelling_someone_elses_payment_is_forbidden() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let owner = create_customer(&state, "Owner").await?;
    let intruder = create_customer(&state, "Intruder").await?;
    let item_id = create_item(&state, "Private", 1000, 100, 5).await?;

    cart_service::add_item(&state, &owner, AddToCartRequest { item_id, quantity: 1 }).await?;
    let order = order_service::checkout(&state, &owner).await?;
    let order_id = order.data.expect("checkout data").order.id;

    let attempt = payment_service::process_card_payment(
        &state,
        &owner,
        order_id,
        CardPaymentRequest {
            card_number: "1234".into(),
        },
    )
    .await?;
    let payment_id = attempt.data.expect("outcome").payment_id;

    let err = cancellation_service::cancel_transaction(&state, &intruder, payment_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}
