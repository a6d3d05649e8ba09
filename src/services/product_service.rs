use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductDetail, ProductList, ProductQuery},
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        product_variants::{
            ActiveModel as VariantActive, Column as VariantCol, Entity as ProductVariants,
            Model as VariantModel,
        },
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{Category, Product, Variant},
    response::{PageMeta, PageRequest},
    services::{category_service::category_from_entity, order_service::check_amount},
    state::AppState,
};

pub async fn list_products(state: &AppState, query: ProductQuery) -> AppResult<ProductList> {
    let page = PageRequest::from_query(query.page, query.page_size, query.limit)?;

    let mut condition = Condition::all().add(Column::IsActive.eq(true));
    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await?;

    let products = finder
        .limit(page.page_size)
        .offset(page.offset())
        .all(&state.orm)
        .await?;

    let products = with_relations(state, products).await?;

    Ok(ProductList {
        products,
        pagination: PageMeta::new(&page, total),
    })
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ProductDetail> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    with_relations(state, vec![product])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Product not found"))
}

pub async fn create_product(
    state: &AppState,
    payload: CreateProductRequest,
) -> AppResult<ProductDetail> {
    let CreateProductRequest {
        name,
        description,
        price,
        compare_at_price,
        images,
        category_id,
        inventory,
        variants,
    } = payload;

    let (Some(name), Some(description), Some(price), Some(category_id)) = (
        name.filter(|n| !n.trim().is_empty()),
        description.filter(|d| !d.trim().is_empty()),
        price,
        category_id,
    ) else {
        return Err(AppError::validation(
            "Name, description, price, and categoryId are required",
        ));
    };

    let price = check_amount("price", price)?;
    let compare_at_price = compare_at_price
        .map(|p| check_amount("compareAtPrice", p))
        .transpose()?;
    let inventory = inventory.unwrap_or(0);
    if inventory < 0 {
        return Err(AppError::validation("inventory cannot be negative"));
    }
    let variants = variants.unwrap_or_default();
    if variants.iter().any(|v| v.inventory.is_some_and(|i| i < 0)) {
        return Err(AppError::validation("variant inventory cannot be negative"));
    }
    for variant in &variants {
        if let Some(price) = variant.price {
            check_amount("variant price", price)?;
        }
    }

    let category = Categories::find_by_id(category_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;

    let txn = state.orm.begin().await?;
    let now = Utc::now();
    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(description),
        price: Set(price),
        compare_at_price: Set(compare_at_price),
        images: Set(images.unwrap_or_default()),
        category_id: Set(category.id),
        inventory: Set(inventory),
        is_active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut saved_variants = Vec::with_capacity(variants.len());
    for variant in variants {
        let row = VariantActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            name: Set(variant.name),
            value: Set(variant.value),
            price: Set(variant.price),
            inventory: Set(variant.inventory.unwrap_or(0)),
        }
        .insert(&txn)
        .await?;
        saved_variants.push(variant_from_entity(row));
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        None,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ProductDetail {
        product: product_from_entity(product),
        category: Some(category_from_entity(category)),
        variants: saved_variants,
    })
}

async fn with_relations(state: &AppState, products: Vec<ProductModel>) -> AppResult<Vec<ProductDetail>> {
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let category_ids: Vec<Uuid> = products
        .iter()
        .map(|p| p.category_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let categories: HashMap<Uuid, Category> = Categories::find()
        .filter(CategoryCol::Id.is_in(category_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|c| (c.id, category_from_entity(c)))
        .collect();

    let mut variants: HashMap<Uuid, Vec<Variant>> = HashMap::new();
    for variant in ProductVariants::find()
        .filter(VariantCol::ProductId.is_in(product_ids))
        .all(&state.orm)
        .await?
    {
        variants
            .entry(variant.product_id)
            .or_default()
            .push(variant_from_entity(variant));
    }

    Ok(products
        .into_iter()
        .map(|product| ProductDetail {
            category: categories.get(&product.category_id).cloned(),
            variants: variants.remove(&product.id).unwrap_or_default(),
            product: product_from_entity(product),
        })
        .collect())
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        compare_at_price: model.compare_at_price,
        images: model.images,
        category_id: model.category_id,
        inventory: model.inventory,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn variant_from_entity(model: VariantModel) -> Variant {
    Variant {
        id: model.id,
        product_id: model.product_id,
        name: model.name,
        value: model.value,
        price: model.price,
        inventory: model.inventory,
    }
}
