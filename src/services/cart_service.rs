use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::cart::{AddToCartRequest, CartContents, CartLineView, CartTotals},
    entity::{
        cart_lines::{
            ActiveModel as CartLineActive, Column as CartCol, Entity as CartLines,
            Model as CartLineModel,
        },
        items::Entity as Items,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartLine,
    response::{ApiResponse, Meta},
    services::inventory_service,
    state::AppState,
};

/// Add an item to the customer's cart, merging quantities when a line for
/// the same item already exists. The quantity is validated against current
/// stock; nothing is reserved until checkout.
pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartLine>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let item = inventory_service::get_item(&state.orm, payload.item_id)
        .await?
        .ok_or_else(|| AppError::BadRequest("item not found".to_string()))?;

    if item.stock < payload.quantity {
        return Err(AppError::Conflict(format!(
            "Insufficient stock for item: {}",
            item.name
        )));
    }

    let existing = CartLines::find()
        .filter(CartCol::CustomerId.eq(user.customer_id))
        .filter(CartCol::ItemId.eq(payload.item_id))
        .one(&state.orm)
        .await?;

    let line = match existing {
        Some(line) => {
            let merged = line.quantity + payload.quantity;
            let mut active: CartLineActive = line.into();
            active.quantity = Set(merged);
            active.update(&state.orm).await?
        }
        None => {
            CartLineActive {
                id: Set(Uuid::new_v4()),
                customer_id: Set(user.customer_id),
                item_id: Set(payload.item_id),
                quantity: Set(payload.quantity),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    if let Err(err) = log_audit(
        state,
        Some(user.customer_id),
        "cart_add",
        Some("cart_lines"),
        Some(serde_json::json!({ "item_id": payload.item_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_line_from_entity(line), None))
}

/// Delete every cart line whose item is now out of stock. Returns the number
/// of removed lines. `view_lines` does not do this by itself; callers that
/// want the original view-with-cleanup behavior run this first.
pub async fn prune_stale_lines<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> AppResult<u64> {
    let stale: Vec<Uuid> = CartLines::find()
        .filter(CartCol::CustomerId.eq(customer_id))
        .find_also_related(Items)
        .all(conn)
        .await?
        .into_iter()
        .filter(|(_, item)| item.as_ref().is_none_or(|i| i.stock <= 0))
        .map(|(line, _)| line.id)
        .collect();

    if stale.is_empty() {
        return Ok(0);
    }

    let result = CartLines::delete_many()
        .filter(CartCol::Id.is_in(stale))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// The customer's cart lines joined with current item price and tax, in the
/// order the lines were added.
pub async fn view_lines<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> AppResult<Vec<CartLineView>> {
    let rows = lines_with_items(customer_id).all(conn).await?;
    rows.into_iter().map(to_line_view).collect()
}

/// Same join, but with the cart and item rows locked for the enclosing
/// transaction. Used by checkout.
pub async fn view_lines_for_update<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> AppResult<Vec<CartLineView>> {
    let rows = lines_with_items(customer_id)
        .lock(LockType::Update)
        .all(conn)
        .await?;
    rows.into_iter().map(to_line_view).collect()
}

pub fn cart_totals(lines: &[CartLineView]) -> CartTotals {
    let subtotal: i64 = lines.iter().map(|l| l.line_subtotal).sum();
    let tax: i64 = lines.iter().map(|l| l.line_tax).sum();
    CartTotals {
        subtotal,
        tax,
        total: subtotal + tax,
        item_count: lines.len() as i64,
    }
}

/// Prune, then view with totals: the composed read the storefront exposes.
pub async fn view_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartContents>> {
    prune_stale_lines(&state.orm, user.customer_id).await?;
    let lines = view_lines(&state.orm, user.customer_id).await?;
    let totals = cart_totals(&lines);
    Ok(ApiResponse::success(
        "OK",
        CartContents { lines, totals },
        Some(Meta::empty()),
    ))
}

pub async fn remove_line(
    state: &AppState,
    user: &AuthUser,
    line_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartLines::delete_many()
        .filter(CartCol::Id.eq(line_id))
        .filter(CartCol::CustomerId.eq(user.customer_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        state,
        Some(user.customer_id),
        "cart_remove",
        Some("cart_lines"),
        Some(serde_json::json!({ "cart_line_id": line_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn clear_cart<C: ConnectionTrait>(conn: &C, customer_id: Uuid) -> AppResult<u64> {
    let result = CartLines::delete_many()
        .filter(CartCol::CustomerId.eq(customer_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

fn lines_with_items(
    customer_id: Uuid,
) -> sea_orm::SelectTwo<crate::entity::cart_lines::Entity, crate::entity::items::Entity> {
    CartLines::find()
        .filter(CartCol::CustomerId.eq(customer_id))
        .order_by_asc(CartCol::CreatedAt)
        .find_also_related(Items)
}

fn to_line_view(
    (line, item): (CartLineModel, Option<crate::entity::items::Model>),
) -> AppResult<CartLineView> {
    let item = item.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("cart line {} references no item", line.id))
    })?;
    Ok(CartLineView {
        id: line.id,
        item_id: item.id,
        item_name: item.name,
        quantity: line.quantity,
        unit_price: item.unit_price,
        unit_tax: item.unit_tax,
        line_subtotal: item.unit_price * line.quantity as i64,
        line_tax: item.unit_tax * line.quantity as i64,
        stock: item.stock,
    })
}

fn cart_line_from_entity(model: CartLineModel) -> CartLine {
    CartLine {
        id: model.id,
        customer_id: model.customer_id,
        item_id: model.item_id,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&chrono::Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i32, unit_price: i64, unit_tax: i64) -> CartLineView {
        CartLineView {
            id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            item_name: "test".into(),
            quantity: qty,
            unit_price,
            unit_tax,
            line_subtotal: unit_price * qty as i64,
            line_tax: unit_tax * qty as i64,
            stock: 100,
        }
    }

    #[test]
    fn totals_sum_subtotal_and_tax() {
        let lines = vec![line(2, 1000, 100), line(1, 500, 0)];
        let totals = cart_totals(&lines);
        assert_eq!(totals.subtotal, 2500);
        assert_eq!(totals.tax, 200);
        assert_eq!(totals.total, 2700);
        assert_eq!(totals.item_count, 2);
    }

    #[test]
    fn totals_of_empty_cart_are_zero() {
        let totals = cart_totals(&[]);
        assert_eq!(totals.subtotal, 0);
        assert_eq!(totals.tax, 0);
        assert_eq!(totals.total, 0);
        assert_eq!(totals.item_count, 0);
    }
}
