use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::{
    entity::customers::{Entity as Customers, Model as CustomerModel},
    error::{AppError, AppResult},
};

pub async fn get_customer<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> AppResult<Option<CustomerModel>> {
    Ok(Customers::find_by_id(customer_id).one(conn).await?)
}

/// Display name for the order snapshot, taken once at checkout.
pub async fn resolve_customer_name<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> AppResult<String> {
    let customer = get_customer(conn, customer_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(customer.name)
}
