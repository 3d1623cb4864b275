use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use uuid::Uuid;

use crate::{
    dto::payments::CancellationOutcome,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::cancellation_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}/cancel", post(cancel_payment))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment and order cancelled, stock restored", body = ApiResponse<CancellationOutcome>),
        (status = 403, description = "Payment belongs to another customer"),
        (status = 404, description = "Payment not found"),
        (status = 409, description = "Payment already resolved"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn cancel_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CancellationOutcome>>> {
    let resp = cancellation_service::cancel_transaction(&state, &user, id).await?;
    Ok(Json(resp))
}
