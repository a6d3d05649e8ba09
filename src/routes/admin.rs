use axum::{
    Json, Router,
    extract::{Path, State, rejection::{JsonRejection, PathRejection}},
    routing::patch,
};
use uuid::Uuid;

use crate::{
    dto::orders::UpdateOrderStatusRequest,
    error::{AppResult, ErrorBody},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/orders/{id}/status", patch(update_order_status))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Order),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 404, description = "Order not found", body = ErrorBody),
        (status = 409, description = "Transition not allowed", body = ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateOrderStatusRequest>, JsonRejection>,
) -> AppResult<Json<Order>> {
    ensure_admin(&user)?;
    let Path(id) = id?;
    let Json(payload) = payload?;
    let order = order_service::update_status(&state, user.user_id, id, payload.status).await?;
    Ok(Json(order))
}
