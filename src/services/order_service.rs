use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit,
    config::OrderPricing,
    dto::orders::{CreateOrderRequest, OrderList, OrderListQuery},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems, Model as OrderItemModel},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    models::{Order, OrderItem, OrderStatus, ProductSummary, UserSummary},
    response::{PageMeta, PageRequest},
    state::AppState,
};

pub const INITIAL_PAYMENT_STATUS: &str = "pending";

/// Largest amount a `NUMERIC(10, 2)` money column holds: 99999999.99.
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// Accepts a positive amount with at most two decimal places that fits the
/// money columns.
pub fn check_amount(field: &str, amount: Decimal) -> AppResult<Decimal> {
    if !amount.is_sign_positive() || amount.is_zero() {
        return Err(AppError::validation(format!("{field} must be positive")));
    }
    if amount.normalize().scale() > 2 {
        return Err(AppError::validation(format!(
            "{field} must have at most two decimal places"
        )));
    }
    let max = max_amount();
    if amount > max {
        return Err(AppError::validation(format!("{field} must not exceed {max}")));
    }
    Ok(amount)
}

/// A create-order request that passed shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub items: Vec<NewOrderItem>,
    pub shipping_address: Option<Value>,
    pub billing_address: Option<Value>,
    pub payment_intent: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub variant_info: Option<String>,
}

impl NewOrderItem {
    /// `None` when the product does not fit a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

impl NewOrder {
    /// Sum of `price * quantity`. Fails when the total does not fit the
    /// `orders.total` column.
    pub fn total(&self) -> AppResult<Decimal> {
        let total = self
            .items
            .iter()
            .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.line_total()?))
            .ok_or_else(|| AppError::validation("Order total is too large"))?;
        check_amount("Order total", total)
    }

    /// Referenced product ids, deduplicated and sorted.
    pub fn distinct_product_ids(&self) -> Vec<Uuid> {
        self.items
            .iter()
            .map(|item| item.product_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Shape checks that need no store access.
pub fn validate_order(payload: CreateOrderRequest) -> AppResult<NewOrder> {
    let CreateOrderRequest {
        user_id,
        items,
        shipping_address,
        billing_address,
        payment_intent,
    } = payload;

    let items = items.unwrap_or_default();
    let Some(user_id) = user_id.filter(|_| !items.is_empty()) else {
        return Err(AppError::validation(
            "User ID and at least one order item are required",
        ));
    };

    let items = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| -> AppResult<NewOrderItem> {
            let product_id = item
                .product_id
                .ok_or_else(|| AppError::validation(format!("items[{index}].productId is required")))?;
            let quantity = item
                .quantity
                .filter(|q| *q > 0)
                .ok_or_else(|| {
                    AppError::validation(format!("items[{index}].quantity must be a positive integer"))
                })?;
            let price = item
                .price
                .ok_or_else(|| AppError::validation(format!("items[{index}].price is required")))?;
            let price = check_amount(&format!("items[{index}].price"), price)?;
            Ok(NewOrderItem {
                product_id,
                quantity,
                price,
                variant_info: item.variant_info,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let order = NewOrder {
        user_id,
        items,
        shipping_address,
        billing_address,
        payment_intent,
    };
    order.total()?;
    Ok(order)
}

/// Applies the configured pricing policy against the resolved catalog rows.
pub fn apply_pricing(
    order: &mut NewOrder,
    products: &HashMap<Uuid, ProductModel>,
    pricing: OrderPricing,
) -> AppResult<()> {
    for item in &mut order.items {
        let Some(product) = products.get(&item.product_id) else {
            return Err(AppError::not_found("One or more products not found"));
        };
        match pricing {
            OrderPricing::Client => {
                if item.price != product.price {
                    tracing::warn!(
                        product_id = %product.id,
                        client_price = %item.price,
                        catalog_price = %product.price,
                        "order item price differs from catalog"
                    );
                }
            }
            OrderPricing::Catalog => {
                item.price = product.price;
            }
        }
    }

    if pricing == OrderPricing::Catalog {
        let mut requested: HashMap<Uuid, i64> = HashMap::new();
        for item in &order.items {
            *requested.entry(item.product_id).or_default() += i64::from(item.quantity);
        }
        for (product_id, quantity) in requested {
            if let Some(product) = products.get(&product_id)
                && i64::from(product.inventory) < quantity
            {
                return Err(AppError::validation(format!(
                    "Insufficient inventory for product {product_id}"
                )));
            }
        }
    }

    Ok(())
}

pub async fn create_order(state: &AppState, payload: CreateOrderRequest) -> AppResult<Order> {
    let mut new_order = validate_order(payload)?;

    let user = Users::find_by_id(new_order.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let product_ids = new_order.distinct_product_ids();
    let products: HashMap<Uuid, ProductModel> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.clone()))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    if products.len() < product_ids.len() {
        return Err(AppError::not_found("One or more products not found"));
    }

    apply_pricing(&mut new_order, &products, state.config.order_pricing)?;
    let total = new_order.total()?;

    let txn = state.orm.begin().await?;
    let (order, items) = insert_order(&txn, &new_order, total).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %order.user_id,
        items = items.len(),
        total = %order.total,
        "order created"
    );

    audit::record(
        &state.pool,
        Some(user.id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    let users = HashMap::from([(user.id, user)]);
    Ok(assemble_order(order, items, &users, &products))
}

/// Writes the order row and one row per item. Callers pass a transaction;
/// nothing is visible until it commits.
async fn insert_order<C: ConnectionTrait>(
    conn: &C,
    new_order: &NewOrder,
    total: Decimal,
) -> AppResult<(OrderModel, Vec<OrderItemModel>)> {
    let now = Utc::now();
    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(new_order.user_id),
        status: Set(OrderStatus::INITIAL),
        total: Set(total),
        shipping_address: Set(new_order.shipping_address.clone()),
        billing_address: Set(new_order.billing_address.clone()),
        payment_intent: Set(new_order.payment_intent.clone()),
        payment_status: Set(INITIAL_PAYMENT_STATUS.to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await?;

    let mut items = Vec::with_capacity(new_order.items.len());
    for item in &new_order.items {
        let row = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            quantity: Set(item.quantity),
            price: Set(item.price),
            variant_info: Set(item.variant_info.clone()),
            created_at: Set(now.into()),
        }
        .insert(conn)
        .await?;
        items.push(row);
    }

    Ok((order, items))
}

pub async fn list_orders(state: &AppState, query: OrderListQuery) -> AppResult<OrderList> {
    let page = PageRequest::from_query(query.page, query.page_size, query.limit)?;

    let mut condition = Condition::all();
    if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }
    if let Some(raw) = query.status.as_deref().filter(|s| !s.is_empty()) {
        match OrderStatus::parse_loose(raw) {
            Some(status) => condition = condition.add(OrderCol::Status.eq(status)),
            None => tracing::debug!(status = raw, "ignoring unknown status filter"),
        }
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt)
        .order_by_desc(OrderCol::Id);

    let total = finder.clone().count(&state.orm).await?;

    let orders = finder
        .limit(page.page_size)
        .offset(page.offset())
        .all(&state.orm)
        .await?;

    let orders = load_relations(state, orders).await?;

    Ok(OrderList {
        orders,
        pagination: PageMeta::new(&page, total),
    })
}

pub async fn get_order(state: &AppState, id: Uuid) -> AppResult<Order> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    load_relations(state, vec![order])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Order not found"))
}

/// Moves an order forward along the fulfillment state machine.
pub async fn update_status(
    state: &AppState,
    actor: Uuid,
    id: Uuid,
    next: OrderStatus,
) -> AppResult<Order> {
    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;

    let current = existing.status;
    if !current.can_transition_to(next) {
        return Err(AppError::conflict(format!(
            "Cannot move order from {current} to {next}"
        )));
    }

    let mut active: OrderActive = existing.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(actor),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": current, "to": next }),
    )
    .await;

    get_order(state, order.id).await
}

/// Batch-loads buyers, items and product summaries for a page of orders.
async fn load_relations(state: &AppState, orders: Vec<OrderModel>) -> AppResult<Vec<Order>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let user_ids: Vec<Uuid> = orders
        .iter()
        .map(|o| o.user_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let product_ids: Vec<Uuid> = items
        .iter()
        .map(|i| i.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let users: HashMap<Uuid, UserModel> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let products: HashMap<Uuid, ProductModel> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };

    let mut items_by_order: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    for item in items {
        items_by_order.entry(item.order_id).or_default().push(item);
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            assemble_order(order, items, &users, &products)
        })
        .collect())
}

fn assemble_order(
    model: OrderModel,
    items: Vec<OrderItemModel>,
    users: &HashMap<Uuid, UserModel>,
    products: &HashMap<Uuid, ProductModel>,
) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        status: model.status,
        total: model.total,
        shipping_address: model.shipping_address,
        billing_address: model.billing_address,
        payment_intent: model.payment_intent,
        payment_status: model.payment_status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        user: users.get(&model.user_id).map(user_summary),
        items: items
            .into_iter()
            .map(|item| order_item_from_entity(item, products))
            .collect(),
    }
}

fn order_item_from_entity(model: OrderItemModel, products: &HashMap<Uuid, ProductModel>) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product: products.get(&model.product_id).map(product_summary),
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        variant_info: model.variant_info,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn user_summary(model: &UserModel) -> UserSummary {
    UserSummary {
        id: model.id,
        email: model.email.clone(),
        name: model.name.clone(),
    }
}

fn product_summary(model: &ProductModel) -> ProductSummary {
    ProductSummary {
        id: model.id,
        name: model.name.clone(),
        images: model.images.clone(),
    }
}
