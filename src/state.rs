use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::services::payment_service::BankAuthorizer;

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    /// Authorization strategy for card payments; tests swap in a
    /// deterministic one.
    pub authorizer: Arc<dyn BankAuthorizer>,
}
