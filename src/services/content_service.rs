use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::content::{ContentList, ContentQuery, CreateContentRequest, UpdateContentRequest},
    entity::contents::{ActiveModel, Column, Entity as Contents, Model as ContentModel},
    error::{AppError, AppResult},
    models::Content,
    response::{PageMeta, PageRequest},
    state::AppState,
};

pub async fn list_contents(state: &AppState, query: ContentQuery) -> AppResult<ContentList> {
    let page = PageRequest::from_query(query.page, query.page_size, query.limit)?;

    let mut condition = Condition::all();
    if let Some(slug) = query.slug.filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Slug.eq(slug));
    }
    if let Some(published) = query.published {
        condition = condition.add(Column::Published.eq(published == "true"));
    }

    let finder = Contents::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await?;
    let contents = finder
        .limit(page.page_size)
        .offset(page.offset())
        .all(&state.orm)
        .await?
        .into_iter()
        .map(content_from_entity)
        .collect();

    Ok(ContentList {
        contents,
        pagination: PageMeta::new(&page, total),
    })
}

pub async fn create_content(state: &AppState, payload: CreateContentRequest) -> AppResult<Content> {
    let (Some(title), Some(slug), Some(body)) = (
        payload.title.filter(|t| !t.is_empty()),
        payload.slug.filter(|s| !s.is_empty()),
        payload.content.filter(|c| !c.is_empty()),
    ) else {
        return Err(AppError::validation("Title, slug, and content are required"));
    };

    ensure_slug_free(state, &slug).await?;

    let now = Utc::now();
    let content = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        slug: Set(slug),
        content: Set(body),
        excerpt: Set(payload.excerpt),
        featured_image: Set(payload.featured_image),
        published: Set(payload.published.unwrap_or(false)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(content_from_entity(content))
}

pub async fn update_content(state: &AppState, payload: UpdateContentRequest) -> AppResult<Content> {
    let id = payload
        .id
        .ok_or_else(|| AppError::validation("Content ID is required"))?;

    let existing = Contents::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Content not found"))?;

    if let Some(slug) = payload.slug.as_deref().filter(|s| !s.is_empty())
        && slug != existing.slug
    {
        ensure_slug_free(state, slug).await?;
    }

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title.filter(|t| !t.is_empty()) {
        active.title = Set(title);
    }
    if let Some(slug) = payload.slug.filter(|s| !s.is_empty()) {
        active.slug = Set(slug);
    }
    if let Some(body) = payload.content.filter(|c| !c.is_empty()) {
        active.content = Set(body);
    }
    if let Some(excerpt) = payload.excerpt {
        active.excerpt = Set(Some(excerpt));
    }
    if let Some(featured_image) = payload.featured_image {
        active.featured_image = Set(Some(featured_image));
    }
    if let Some(published) = payload.published {
        active.published = Set(published);
    }
    active.updated_at = Set(Utc::now().into());

    let content = active.update(&state.orm).await?;
    Ok(content_from_entity(content))
}

pub async fn delete_content(state: &AppState, id: Option<Uuid>) -> AppResult<()> {
    let id = id.ok_or_else(|| AppError::validation("Content ID is required"))?;

    let result = Contents::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Content not found"));
    }
    Ok(())
}

async fn ensure_slug_free(state: &AppState, slug: &str) -> AppResult<()> {
    let taken = Contents::find()
        .filter(Column::Slug.eq(slug))
        .one(&state.orm)
        .await?
        .is_some();
    if taken {
        return Err(AppError::conflict("Content with this slug already exists"));
    }
    Ok(())
}

fn content_from_entity(model: ContentModel) -> Content {
    Content {
        id: model.id,
        title: model.title,
        slug: model.slug,
        content: model.content,
        excerpt: model.excerpt,
        featured_image: model.featured_image,
        published: model.published,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
