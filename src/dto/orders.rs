use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    models::{Order, OrderStatus},
    response::PageMeta,
};

/// Body of `POST /api/orders`. Every field is optional on the wire so that
/// missing values surface as validation errors instead of parse failures.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Option<Uuid>,
    pub items: Option<Vec<CreateOrderItem>>,
    #[schema(value_type = Option<Object>)]
    pub shipping_address: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub billing_address: Option<Value>,
    pub payment_intent: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i32>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub variant_info: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub user_id: Option<Uuid>,
    /// Case-insensitive; unknown values are ignored.
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    /// Overrides `pageSize` when present.
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub orders: Vec<Order>,
    pub pagination: PageMeta,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}
