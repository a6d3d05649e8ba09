use axum::{
    Json, Router,
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::users::{CreateUserRequest, UserList, UserQuery, UserWithAddresses},
    error::{AppResult, ErrorBody},
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_users).post(create_user))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Users with order and address counts", body = UserList),
        (status = 400, description = "Invalid query", body = ErrorBody),
    ),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> AppResult<Json<UserList>> {
    let Query(query) = query?;
    Ok(Json(user_service::list_users(&state, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserWithAddresses),
        (status = 400, description = "Email is required", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody),
    ),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserWithAddresses>)> {
    let Json(payload) = payload?;
    let user = user_service::create_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
