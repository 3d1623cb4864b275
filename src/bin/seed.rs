use axum_storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        customers::{ActiveModel as CustomerActive, Column as CustomerCol, Entity as Customers},
        items::{ActiveModel as ItemActive, Column as ItemCol, Entity as Items},
    },
};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let customer_id = ensure_customer(&orm, "Demo Customer", "customer@example.com").await?;
    seed_items(&orm).await?;

    println!("Seed completed. Customer ID: {customer_id}");
    Ok(())
}

async fn ensure_customer(
    orm: &DatabaseConnection,
    name: &str,
    email: &str,
) -> anyhow::Result<Uuid> {
    let existing = Customers::find()
        .filter(CustomerCol::Email.eq(email))
        .one(orm)
        .await?;
    if let Some(customer) = existing {
        return Ok(customer.id);
    }

    let customer = CustomerActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    println!("Ensured customer {email}");
    Ok(customer.id)
}

async fn seed_items(orm: &DatabaseConnection) -> anyhow::Result<()> {
    // (name, unit_price, unit_tax, stock) — prices in minor units.
    let items = vec![
        ("Road Guardian Dash Cam", 12_900, 1_290, 25),
        ("Night Owl Rear Camera", 7_500, 750, 40),
        ("128GB Endurance SD Card", 2_400, 240, 120),
        ("Hardwire Install Kit", 1_900, 190, 60),
    ];

    for (name, unit_price, unit_tax, stock) in items {
        let exists = Items::find()
            .filter(ItemCol::Name.eq(name))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        ItemActive {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            unit_price: Set(unit_price),
            stock: Set(stock),
            unit_tax: Set(unit_tax),
            created_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded items");
    Ok(())
}
