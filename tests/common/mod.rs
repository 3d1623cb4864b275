#![allow(dead_code)]

use std::sync::Arc;

use axum_storefront_api::{
    db::{create_orm_conn, run_migrations},
    entity::{
        customers::ActiveModel as CustomerActive,
        items::ActiveModel as ItemActive,
    },
    middleware::auth::AuthUser,
    services::payment_service::BankAuthorizer,
    state::AppState,
};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::ActiveModelTrait;
use uuid::Uuid;

/// Deterministic stand-in for the coin-flip authorizer.
pub struct FixedAuthorizer(pub bool);

impl BankAuthorizer for FixedAuthorizer {
    fn authorize(&self, _amount: i64) -> bool {
        self.0
    }
}

/// Returns None (skipping the test) when no database is configured.
pub async fn setup_state(approve: bool) -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    Ok(Some(AppState {
        orm,
        authorizer: Arc::new(FixedAuthorizer(approve)),
    }))
}

/// Same connection, different authorization outcome. Used for retry flows.
pub fn with_authorizer(state: &AppState, approve: bool) -> AppState {
    AppState {
        orm: state.orm.clone(),
        authorizer: Arc::new(FixedAuthorizer(approve)),
    }
}

pub async fn create_customer(state: &AppState, name: &str) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    CustomerActive {
        id: Set(id),
        name: Set(name.to_string()),
        email: Set(format!("{id}@example.com")),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        customer_id: id,
        role: "user".into(),
    })
}

pub async fn create_item(
    state: &AppState,
    name: &str,
    unit_price: i64,
    unit_tax: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let item = ItemActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("{name} {}", Uuid::new_v4())),
        unit_price: Set(unit_price),
        stock: Set(stock),
        unit_tax: Set(unit_tax),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(item.id)
}

pub async fn item_stock(state: &AppState, item_id: Uuid) -> anyhow::Result<i32> {
    use axum_storefront_api::services::inventory_service;
    let item = inventory_service::get_item(&state.orm, item_id)
        .await?
        .expect("item exists");
    Ok(item.stock)
}

pub async fn set_stock(state: &AppState, item_id: Uuid, stock: i32) -> anyhow::Result<()> {
    use axum_storefront_api::entity::items::{ActiveModel, Entity as Items};
    use sea_orm::EntityTrait;

    let item = Items::find_by_id(item_id)
        .one(&state.orm)
        .await?
        .expect("item exists");
    let mut active: ActiveModel = item.into();
    active.stock = Set(stock);
    active.update(&state.orm).await?;
    Ok(())
}
