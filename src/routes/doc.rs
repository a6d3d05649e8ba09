use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse},
        categories::CreateCategoryRequest,
        content::{ContentList, CreateContentRequest, DeleteResponse, UpdateContentRequest},
        orders::{CreateOrderItem, CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
        products::{CreateProductRequest, CreateVariantRequest, ProductDetail, ProductList},
        users::{AddressInput, CreateUserRequest, UserCounts, UserList, UserListItem, UserWithAddresses},
    },
    error::ErrorBody,
    models::{
        Address, Category, Content, Order, OrderItem, OrderStatus, Product, ProductSummary, Role,
        User, UserSummary, Variant,
    },
    response::PageMeta,
    routes::{admin, auth, categories, content, health, orders, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::logout,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        products::list_products,
        products::create_product,
        products::get_product,
        users::list_users,
        users::create_user,
        categories::list_categories,
        categories::create_category,
        content::list_contents,
        content::create_content,
        content::update_content,
        content::delete_content,
        admin::update_order_status
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            User,
            Address,
            Category,
            Product,
            Variant,
            Content,
            Order,
            OrderItem,
            UserSummary,
            ProductSummary,
            PageMeta,
            ErrorBody,
            LoginRequest,
            LoginResponse,
            CreateOrderRequest,
            CreateOrderItem,
            OrderList,
            UpdateOrderStatusRequest,
            CreateProductRequest,
            CreateVariantRequest,
            ProductDetail,
            ProductList,
            CreateUserRequest,
            AddressInput,
            UserCounts,
            UserListItem,
            UserList,
            UserWithAddresses,
            CreateCategoryRequest,
            CreateContentRequest,
            UpdateContentRequest,
            ContentList,
            DeleteResponse,
            health::HealthData
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Order placement and listing"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Users", description = "User endpoints"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Content", description = "CMS content endpoints"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Auth", description = "Session endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
