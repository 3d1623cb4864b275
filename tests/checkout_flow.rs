mod common;

use axum_storefront_api::{
    dto::cart::AddToCartRequest,
    error::AppError,
    models::OrderStatus,
    services::{cart_service, inventory_service, order_service},
};
use common::{create_customer, create_item, item_stock, set_stock, setup_state};

#[tokio::test]
async fn re_adding_an_item_merges_into_one_line() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Merge Tester").await?;
    let item_id = create_item(&state, "Widget", 1000, 100, 10).await?;

    cart_service::add_item(&state, &user, AddToCartRequest { item_id, quantity: 2 }).await?;
    cart_service::add_item(&state, &user, AddToCartRequest { item_id, quantity: 3 }).await?;

    let lines = cart_service::view_lines(&state.orm, user.customer_id).await?;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 5);

    Ok(())
}

#[tokio::test]
async fn adding_beyond_stock_is_rejected() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Stock Tester").await?;
    let item_id = create_item(&state, "Scarce", 1000, 0, 1).await?;

    let err = cart_service::add_item(&state, &user, AddToCartRequest { item_id, quantity: 2 })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    Ok(())
}

#[tokio::test]
async fn checkout_freezes_prices_and_clears_cart() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Checkout Tester").await?;
    // 10.00 with 1.00 tax per unit, stock 5
    let item_id = create_item(&state, "Dash Cam", 1000, 100, 5).await?;

    cart_service::add_item(&state, &user, AddToCartRequest { item_id, quantity: 2 }).await?;

    let resp = order_service::checkout(&state, &user).await?;
    let data = resp.data.expect("checkout data");

    assert_eq!(data.order.status, OrderStatus::Pending);
    assert_eq!(data.lines.len(), 1);
    assert_eq!(data.lines[0].quantity, 2);
    assert_eq!(data.lines[0].unit_price, 1000);
    assert_eq!(data.lines[0].subtotal, 2000);
    assert_eq!(data.lines[0].line_tax, 200);
    assert_eq!(data.totals.subtotal, 2000);
    assert_eq!(data.totals.tax, 200);
    assert_eq!(data.totals.total, 2200);

    // Stock was reserved, cart was cleared.
    assert_eq!(item_stock(&state, item_id).await?, 3);
    let lines = cart_service::view_lines(&state.orm, user.customer_id).await?;
    assert!(lines.is_empty());

    // A later price change must not leak into the snapshot.
    let item = inventory_service::get_item(&state.orm, item_id)
        .await?
        .expect("item");
    let mut active: axum_storefront_api::entity::items::ActiveModel = item.into();
    active.unit_price = sea_orm::ActiveValue::Set(9999);
    sea_orm::ActiveModelTrait::update(active, &state.orm).await?;

    let fetched = order_service::get_order(&state, &user, data.order.id).await?;
    let fetched = fetched.data.expect("order data");
    assert_eq!(fetched.totals.total, 2200);

    Ok(())
}

#[tokio::test]
async fn failed_checkout_rolls_back_everything() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Atomicity Tester").await?;
    let item_a = create_item(&state, "Plentiful", 1000, 100, 5).await?;
    let item_b = create_item(&state, "Scarce", 500, 0, 2).await?;

    cart_service::add_item(&state, &user, AddToCartRequest { item_id: item_a, quantity: 2 })
        .await?;
    cart_service::add_item(&state, &user, AddToCartRequest { item_id: item_b, quantity: 2 })
        .await?;

    // Stock drops below the cart quantity after the lines were added; the
    // prune only removes fully out-of-stock items, so checkout will try to
    // reserve 2 of 1 and must abort the whole attempt.
    set_stock(&state, item_b, 1).await?;

    let err = order_service::checkout(&state, &user).await.unwrap_err();
    match err {
        AppError::Conflict(msg) => assert!(msg.contains("Scarce"), "message was: {msg}"),
        other => panic!("expected Conflict, got {other:?}"),
    }

    // No stock was consumed, the cart is intact, no order exists.
    assert_eq!(item_stock(&state, item_a).await?, 5);
    assert_eq!(item_stock(&state, item_b).await?, 1);
    let lines = cart_service::view_lines(&state.orm, user.customer_id).await?;
    assert_eq!(lines.len(), 2);

    let orders = order_service::list_orders(
        &state,
        &user,
        axum_storefront_api::routes::params::Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    assert!(orders.data.expect("order list").items.is_empty());

    Ok(())
}

#[tokio::test]
async fn checkout_of_empty_cart_fails() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Empty Cart Tester").await?;

    let err = order_service::checkout(&state, &user).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    Ok(())
}

#[tokio::test]
async fn only_admins_update_order_status() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Status Tester").await?;
    let item_id = create_item(&state, "Shippable", 1000, 100, 5).await?;

    cart_service::add_item(&state, &user, AddToCartRequest { item_id, quantity: 1 }).await?;
    let order = order_service::checkout(&state, &user).await?;
    let order_id = order.data.expect("checkout data").order.id;

    let err = order_service::update_status(
        &state,
        &user,
        order_id,
        axum_storefront_api::dto::orders::UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let admin = axum_storefront_api::middleware::auth::AuthUser {
        customer_id: user.customer_id,
        role: "admin".into(),
    };
    let updated = order_service::update_status(
        &state,
        &admin,
        order_id,
        axum_storefront_api::dto::orders::UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
        },
    )
    .await?;
    assert_eq!(updated.data.expect("order").status, OrderStatus::Shipped);

    Ok(())
}

#[tokio::test]
async fn prune_removes_out_of_stock_lines() -> anyhow::Result<()> {
    let Some(state) = setup_state(true).await? else {
        return Ok(());
    };
    let user = create_customer(&state, "Prune Tester").await?;
    let item_id = create_item(&state, "Vanishing", 1000, 0, 1).await?;

    cart_service::add_item(&state, &user, AddToCartRequest { item_id, quantity: 1 }).await?;
    set_stock(&state, item_id, 0).await?;

    // The prune is observable on its own, separate from the view.
    let removed = cart_service::prune_stale_lines(&state.orm, user.customer_id).await?;
    assert_eq!(removed, 1);

    let lines = cart_service::view_lines(&state.orm, user.customer_id).await?;
    assert!(lines.is_empty());

    Ok(())
}
