use axum::{
    Json, Router,
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::categories::{CategoryQuery, CreateCategoryRequest},
    error::{AppResult, ErrorBody},
    models::Category,
    services::category_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_categories).post(create_category))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    params(CategoryQuery),
    responses((status = 200, description = "All categories", body = Vec<Category>)),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    query: Result<Query<CategoryQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Category>>> {
    let Query(query) = query?;
    Ok(Json(category_service::list_categories(&state, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 400, description = "Name is required", body = ErrorBody),
        (status = 409, description = "Name already used", body = ErrorBody),
    ),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let Json(payload) = payload?;
    let category = category_service::create_category(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}
