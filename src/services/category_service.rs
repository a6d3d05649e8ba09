use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use crate::{
    dto::categories::{CategoryQuery, CreateCategoryRequest},
    entity::categories::{ActiveModel, Column, Entity as Categories, Model as CategoryModel},
    error::{AppError, AppResult},
    models::Category,
    state::AppState,
};

pub async fn list_categories(state: &AppState, query: CategoryQuery) -> AppResult<Vec<Category>> {
    let mut finder = Categories::find().order_by_asc(Column::Name);
    match query.limit {
        Some(limit) if limit > 0 => finder = finder.limit(limit as u64),
        Some(_) => return Err(AppError::validation("limit must be a positive integer")),
        None => {}
    }

    Ok(finder
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect())
}

pub async fn create_category(state: &AppState, payload: CreateCategoryRequest) -> AppResult<Category> {
    let name = payload
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| AppError::validation("Name is required"))?;

    let now = Utc::now();
    let category = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        description: Set(payload.description),
        image: Set(payload.image),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(category_from_entity(category))
}

pub fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        description: model.description,
        image: model.image,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
