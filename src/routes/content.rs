use axum::{
    Json, Router,
    extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::content::{
        ContentList, ContentQuery, CreateContentRequest, DeleteContentQuery, DeleteResponse,
        UpdateContentRequest,
    },
    error::{AppResult, ErrorBody},
    models::Content,
    services::content_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(list_contents)
            .post(create_content)
            .put(update_content)
            .delete(delete_content),
    )
}

#[utoipa::path(
    get,
    path = "/api/content",
    params(ContentQuery),
    responses((status = 200, description = "Content entries", body = ContentList)),
    tag = "Content"
)]
pub async fn list_contents(
    State(state): State<AppState>,
    query: Result<Query<ContentQuery>, QueryRejection>,
) -> AppResult<Json<ContentList>> {
    let Query(query) = query?;
    Ok(Json(content_service::list_contents(&state, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/content",
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Content created", body = Content),
        (status = 400, description = "Missing required fields", body = ErrorBody),
        (status = 409, description = "Slug already used", body = ErrorBody),
    ),
    tag = "Content"
)]
pub async fn create_content(
    State(state): State<AppState>,
    payload: Result<Json<CreateContentRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Content>)> {
    let Json(payload) = payload?;
    let content = content_service::create_content(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(content)))
}

#[utoipa::path(
    put,
    path = "/api/content",
    request_body = UpdateContentRequest,
    responses(
        (status = 200, description = "Content updated", body = Content),
        (status = 400, description = "Content ID is required", body = ErrorBody),
        (status = 404, description = "Content not found", body = ErrorBody),
        (status = 409, description = "Slug already used", body = ErrorBody),
    ),
    tag = "Content"
)]
pub async fn update_content(
    State(state): State<AppState>,
    payload: Result<Json<UpdateContentRequest>, JsonRejection>,
) -> AppResult<Json<Content>> {
    let Json(payload) = payload?;
    Ok(Json(content_service::update_content(&state, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/content",
    params(DeleteContentQuery),
    responses(
        (status = 200, description = "Content deleted", body = DeleteResponse),
        (status = 400, description = "Content ID is required", body = ErrorBody),
        (status = 404, description = "Content not found", body = ErrorBody),
    ),
    tag = "Content"
)]
pub async fn delete_content(
    State(state): State<AppState>,
    query: Result<Query<DeleteContentQuery>, QueryRejection>,
) -> AppResult<Json<DeleteResponse>> {
    let Query(query) = query?;
    content_service::delete_content(&state, query.id).await?;
    Ok(Json(DeleteResponse { success: true }))
}
