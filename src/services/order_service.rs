use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{OrderList, OrderTotals, OrderWithLines, UpdateOrderStatusRequest},
    entity::{
        order_lines::{
            ActiveModel as OrderLineActive, Column as OrderLineCol, Entity as OrderLines,
            Model as OrderLineModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderLine, OrderStatus},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{cart_service, customer_service, inventory_service},
    state::AppState,
};

/// Convert the caller's cart into a PENDING order inside one transaction:
/// snapshot the customer name, reserve stock per line in cart order, freeze
/// each line's price and tax, clear the cart. Any failure rolls the whole
/// attempt back; a failed checkout leaves no order, no lines, and no stock
/// change.
pub async fn checkout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderWithLines>> {
    let txn = state.orm.begin().await?;

    cart_service::prune_stale_lines(&txn, user.customer_id).await?;
    let cart_lines = cart_service::view_lines_for_update(&txn, user.customer_id).await?;
    if cart_lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let customer_name = customer_service::resolve_customer_name(&txn, user.customer_id).await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        customer_id: Set(user.customer_id),
        customer_name: Set(customer_name),
        status: Set(OrderStatus::Pending),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut lines: Vec<OrderLine> = Vec::with_capacity(cart_lines.len());
    for cart_line in &cart_lines {
        // Prices were captured once by the cart view above; the reservation
        // is the only re-read of item state.
        let reserved =
            inventory_service::reserve(&txn, cart_line.item_id, cart_line.quantity).await?;
        if !reserved {
            return Err(AppError::Conflict(format!(
                "Insufficient stock for item: {}",
                cart_line.item_name
            )));
        }

        let line = OrderLineActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            item_id: Set(cart_line.item_id),
            item_name: Set(cart_line.item_name.clone()),
            quantity: Set(cart_line.quantity),
            unit_price: Set(cart_line.unit_price),
            subtotal: Set(cart_line.line_subtotal),
            line_tax: Set(cart_line.line_tax),
        }
        .insert(&txn)
        .await?;

        lines.push(order_line_from_entity(line));
    }

    cart_service::clear_cart(&txn, user.customer_id).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        state,
        Some(user.customer_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let totals = totals_from_lines(&lines);
    Ok(ApiResponse::success(
        "Order created. Please proceed to payment.",
        OrderWithLines {
            order: order_from_entity(order),
            lines,
            totals,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithLines>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CustomerId.eq(user.customer_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let lines: Vec<OrderLine> = order_lines(&state.orm, order.id)
        .await?
        .into_iter()
        .map(order_line_from_entity)
        .collect();

    let totals = totals_from_lines(&lines);
    Ok(ApiResponse::success(
        "OK",
        OrderWithLines {
            order: order_from_entity(order),
            lines,
            totals,
        },
        Some(Meta::empty()),
    ))
}

/// The caller's order history, newest first.
pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Orders::find()
        .filter(OrderCol::CustomerId.eq(user.customer_id))
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items: orders }, Some(meta)))
}

/// Admin-only status transition. The status enum is closed, so unknown
/// values never reach this function.
pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        state,
        Some(user.customer_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status.as_str() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(order),
        Some(Meta::empty()),
    ))
}

pub async fn order_lines<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderLineModel>> {
    Ok(OrderLines::find()
        .filter(OrderLineCol::OrderId.eq(order_id))
        .all(conn)
        .await?)
}

pub async fn order_lines_for_update<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderLineModel>> {
    Ok(OrderLines::find()
        .filter(OrderLineCol::OrderId.eq(order_id))
        .lock(LockType::Update)
        .all(conn)
        .await?)
}

/// Totals are always derived from the line snapshots, never stored.
pub fn totals_from_lines(lines: &[OrderLine]) -> OrderTotals {
    let subtotal: i64 = lines.iter().map(|l| l.subtotal).sum();
    let tax: i64 = lines.iter().map(|l| l.line_tax).sum();
    OrderTotals {
        subtotal,
        tax,
        total: subtotal + tax,
    }
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        customer_id: model.customer_id,
        customer_name: model.customer_name,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_line_from_entity(model: OrderLineModel) -> OrderLine {
    OrderLine {
        id: model.id,
        order_id: model.order_id,
        item_id: model.item_id,
        item_name: model.item_name,
        quantity: model.quantity,
        unit_price: model.unit_price,
        subtotal: model.subtotal,
        line_tax: model.line_tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(qty: i32, unit_price: i64, line_tax: i64) -> OrderLine {
        OrderLine {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            item_name: "test".into(),
            quantity: qty,
            unit_price,
            subtotal: unit_price * qty as i64,
            line_tax,
        }
    }

    #[test]
    fn order_totals_are_derived_from_snapshots() {
        // qty 2 at 10.00 with 1.00 tax per unit: 20.00 + 2.00 = 22.00
        let lines = vec![snapshot(2, 1000, 200)];
        let totals = totals_from_lines(&lines);
        assert_eq!(totals.subtotal, 2000);
        assert_eq!(totals.tax, 200);
        assert_eq!(totals.total, 2200);
    }

    #[test]
    fn order_totals_sum_across_lines() {
        let lines = vec![snapshot(2, 1000, 200), snapshot(3, 500, 0)];
        let totals = totals_from_lines(&lines);
        assert_eq!(totals.subtotal, 3500);
        assert_eq!(totals.tax, 200);
        assert_eq!(totals.total, 3700);
    }
}
