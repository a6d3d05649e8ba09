use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{AppendHeaders, IntoResponse},
    routing::post,
};

use crate::{
    dto::auth::{LoginRequest, LoginResponse},
    error::{AppResult, ErrorBody},
    services::auth_service::login_user,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued; also set as a cookie", body = LoginResponse),
        (status = 400, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let (resp, issued) = login_user(&state, payload).await?;
    let cookie = state.sessions.cookie(&issued)?;
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Session cookie cleared")),
    tag = "Auth"
)]
pub async fn logout(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let cookie = state.sessions.clear_cookie()?;
    Ok((StatusCode::NO_CONTENT, AppendHeaders([(header::SET_COOKIE, cookie)])))
}
