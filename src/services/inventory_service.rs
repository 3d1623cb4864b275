use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    entity::items::{Column as ItemCol, Entity as Items, Model as ItemModel},
    error::{AppError, AppResult},
    models::Item,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Atomically decrement stock by `qty` if at least `qty` is available.
///
/// This is a single conditional UPDATE, never read-then-write, so two
/// concurrent reservations against a stock of 1 cannot both succeed.
/// Returns `Ok(false)` when stock was insufficient.
pub async fn reserve<C: ConnectionTrait>(conn: &C, item_id: Uuid, qty: i32) -> AppResult<bool> {
    let result = Items::update_many()
        .col_expr(ItemCol::Stock, Expr::col(ItemCol::Stock).sub(qty))
        .filter(ItemCol::Id.eq(item_id))
        .filter(ItemCol::Stock.gte(qty))
        .exec(conn)
        .await?;

    Ok(result.rows_affected > 0)
}

/// Unconditionally give back `qty` units, the compensating action for a
/// cancelled order line. Not idempotent: the caller must invoke it at most
/// once per cancelled line.
pub async fn release<C: ConnectionTrait>(conn: &C, item_id: Uuid, qty: i32) -> AppResult<()> {
    let result = Items::update_many()
        .col_expr(ItemCol::Stock, Expr::col(ItemCol::Stock).add(qty))
        .filter(ItemCol::Id.eq(item_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub async fn get_item<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
) -> AppResult<Option<ItemModel>> {
    Ok(Items::find_by_id(item_id).one(conn).await?)
}

pub async fn list_available_items(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<crate::routes::items::ItemList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Items::find()
        .filter(ItemCol::Stock.gt(0))
        .order_by_asc(ItemCol::Name);

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(item_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Items",
        crate::routes::items::ItemList { items },
        Some(meta),
    ))
}

pub fn item_from_entity(model: ItemModel) -> Item {
    Item {
        id: model.id,
        name: model.name,
        unit_price: model.unit_price,
        stock: model.stock,
        unit_tax: model.unit_tax,
        created_at: model.created_at.with_timezone(&chrono::Utc),
    }
}
