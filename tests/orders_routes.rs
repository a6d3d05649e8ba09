use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use sea_orm::SqlxPostgresConnector;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{categories::CreateCategoryRequest, products::CreateProductRequest, users::CreateUserRequest},
    middleware::guard::{AccessGuard, GuardConfig},
    routes::build_app,
    services::{category_service, product_service, user_service, user_service::UserRoles},
    state::AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

fn app(state: AppState) -> Router {
    let guard = AccessGuard::new(
        GuardConfig::from_app_config(&state.config),
        state.sessions.clone(),
        Arc::new(UserRoles::new(state.orm.clone())),
    );
    build_app(state, guard)
}

/// State whose connections are never opened; enough for requests rejected
/// before any store access.
fn offline_state() -> AppState {
    let url = "postgres://storefront@127.0.0.1:1/unused";
    let pool = PgPoolOptions::new()
        .connect_lazy(url)
        .expect("lazy pool");
    let orm = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
    AppState::new(pool, orm, AppConfig::with_defaults(url, "test-secret"))
}

async fn post_json(app: Router, uri: &str, body: impl Into<Body>) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn assert_error(response: Response, status: StatusCode) {
    assert_eq!(response.status(), status);
    let body = json_body(response).await;
    assert!(body["error"].is_string(), "expected {{error}} body, got {body}");
}

fn order_body(user_id: Uuid, product_id: Uuid, quantity: i64, price: &str) -> String {
    json!({
        "userId": user_id,
        "items": [{ "productId": product_id, "quantity": quantity, "price": price }],
        "shippingAddress": { "line1": "1 Main St" },
    })
    .to_string()
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let response = post_json(app(offline_state()), "/api/orders", "{not json").await;
    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn missing_body_is_bad_request() {
    let response = post_json(app(offline_state()), "/api/orders", Body::empty()).await;
    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn missing_content_type_is_bad_request() {
    let response = app(offline_state())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/orders")
                .body(Body::from(order_body(Uuid::new_v4(), Uuid::new_v4(), 1, "1.00")))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn empty_items_is_bad_request() {
    let body = json!({ "userId": Uuid::new_v4(), "items": [] }).to_string();
    let response = post_json(app(offline_state()), "/api/orders", body).await;
    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn out_of_range_prices_are_bad_request() {
    for price in ["79228162514264337593543950335", "100000000.00", "0.005", "-1"] {
        let body = order_body(Uuid::new_v4(), Uuid::new_v4(), 2, price);
        let response = post_json(app(offline_state()), "/api/orders", body).await;
        assert_error(response, StatusCode::BAD_REQUEST).await;
    }
}

#[tokio::test]
async fn oversized_page_is_bad_request() {
    for uri in [
        "/api/orders?page=9223372036854775807",
        "/api/orders?page=0",
        "/api/orders?pageSize=-5",
        "/api/products?page=9223372036854775807",
    ] {
        let response = get(app(offline_state()), uri).await;
        assert_error(response, StatusCode::BAD_REQUEST).await;
    }
}

#[tokio::test]
async fn invalid_order_id_is_bad_request() {
    let response = get(app(offline_state()), "/api/orders/not-a-uuid").await;
    assert_error(response, StatusCode::BAD_REQUEST).await;
}

#[tokio::test]
async fn unknown_route_is_json_not_found() {
    let response = get(app(offline_state()), "/api/nope").await;
    assert_error(response, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn create_order_over_http() -> anyhow::Result<()> {
    // Needs a real database; no tables are truncated here.
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run HTTP order tests.");
        return Ok(());
    };

    let pool = create_pool(&database_url).await?;
    run_migrations(&pool).await?;
    let orm = create_orm_conn(&database_url).await?;
    let state = AppState::new(pool, orm, AppConfig::with_defaults(&database_url, "test-secret"));

    let tag = Uuid::new_v4();
    let category = category_service::create_category(
        &state,
        CreateCategoryRequest {
            name: Some(format!("Routes {tag}")),
            ..Default::default()
        },
    )
    .await?;
    let product = product_service::create_product(
        &state,
        CreateProductRequest {
            name: Some("Route Mug".into()),
            description: Some("Mug for route tests".into()),
            price: Some("12.50".parse()?),
            category_id: Some(category.id),
            inventory: Some(10),
            ..Default::default()
        },
    )
    .await?;
    let user = user_service::create_user(
        &state,
        CreateUserRequest {
            email: Some(format!("routes-{tag}@example.com")),
            ..Default::default()
        },
    )
    .await?;

    let response = post_json(
        app(state.clone()),
        "/api/orders",
        order_body(user.user.id, product.product.id, 2, "12.50"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = json_body(response).await;
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["items"].as_array().map(Vec::len), Some(1));
    let total: rust_decimal::Decimal = order["total"].as_str().unwrap_or_default().parse()?;
    assert_eq!(total, "25.00".parse()?);

    let order_id = order["id"].as_str().unwrap_or_default().to_string();
    let response = get(app(state.clone()), &format!("/api/orders/{order_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["id"], order_id.as_str());

    let response = post_json(
        app(state.clone()),
        "/api/orders",
        order_body(user.user.id, Uuid::new_v4(), 1, "1.00"),
    )
    .await;
    assert_error(response, StatusCode::NOT_FOUND).await;

    let response = post_json(
        app(state),
        "/api/orders",
        order_body(Uuid::new_v4(), product.product.id, 1, "12.50"),
    )
    .await;
    assert_error(response, StatusCode::NOT_FOUND).await;

    Ok(())
}
