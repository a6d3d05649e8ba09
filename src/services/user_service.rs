use std::collections::HashMap;

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use async_trait::async_trait;
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{CreateUserRequest, UserCounts, UserList, UserListItem, UserQuery, UserWithAddresses},
    entity::{
        addresses::{ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses, Model as AddressModel},
        orders::{Column as OrderCol, Entity as Orders},
        users::{ActiveModel, Column, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::guard::RoleLookup,
    models::{Address, Role, User},
    response::{PageMeta, PageRequest},
    state::AppState,
};

/// Role lookup backed by the `users` table.
#[derive(Clone)]
pub struct UserRoles {
    orm: DatabaseConnection,
}

impl UserRoles {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl RoleLookup for UserRoles {
    async fn role_of(&self, user_id: Uuid) -> AppResult<Option<Role>> {
        let role = Users::find_by_id(user_id)
            .select_only()
            .column(Column::Role)
            .into_tuple::<Role>()
            .one(&self.orm)
            .await?;
        Ok(role)
    }
}

pub async fn list_users(state: &AppState, query: UserQuery) -> AppResult<UserList> {
    let page = PageRequest::from_query(query.page, query.page_size, query.limit)?;

    let mut condition = Condition::all();
    if let Some(email) = query.email.as_deref().filter(|e| !e.is_empty()) {
        condition = condition.add(Column::Email.contains(email));
    }
    if let Some(role) = query.role.as_deref().and_then(|r| r.parse::<Role>().ok()) {
        condition = condition.add(Column::Role.eq(role));
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await?;
    let users = finder
        .limit(page.page_size)
        .offset(page.offset())
        .all(&state.orm)
        .await?;

    let ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let order_counts = count_by_user(
        Orders::find()
            .select_only()
            .column(OrderCol::UserId)
            .column_as(Expr::col(OrderCol::Id).count(), "count")
            .filter(OrderCol::UserId.is_in(ids.clone()))
            .group_by(OrderCol::UserId)
            .into_tuple::<(Uuid, i64)>()
            .all(&state.orm)
            .await?,
    );
    let address_counts = count_by_user(
        Addresses::find()
            .select_only()
            .column(AddressCol::UserId)
            .column_as(Expr::col(AddressCol::Id).count(), "count")
            .filter(AddressCol::UserId.is_in(ids))
            .group_by(AddressCol::UserId)
            .into_tuple::<(Uuid, i64)>()
            .all(&state.orm)
            .await?,
    );

    let users = users
        .into_iter()
        .map(|user| UserListItem {
            count: UserCounts {
                orders: order_counts.get(&user.id).copied().unwrap_or(0),
                addresses: address_counts.get(&user.id).copied().unwrap_or(0),
            },
            user: user_from_entity(user),
        })
        .collect();

    Ok(UserList {
        users,
        pagination: PageMeta::new(&page, total),
    })
}

pub async fn create_user(state: &AppState, payload: CreateUserRequest) -> AppResult<UserWithAddresses> {
    let email = payload
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation("Email is required"))?;

    let existing = Users::find()
        .filter(Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::conflict("User with this email already exists"));
    }

    let role = payload
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .unwrap_or(Role::User);

    let password_hash = match payload.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let txn = state.orm.begin().await?;
    let now = Utc::now();
    let user = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        name: Set(payload.name),
        image: Set(payload.image),
        password_hash: Set(password_hash),
        role: Set(role),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut addresses = Vec::new();
    for address in payload.addresses.unwrap_or_default() {
        let row = AddressActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            name: Set(address.name),
            line1: Set(address.line1),
            line2: Set(address.line2),
            city: Set(address.city),
            state: Set(address.state),
            postal_code: Set(address.postal_code),
            country: Set(address.country),
            is_default: Set(address.is_default.unwrap_or(false)),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        addresses.push(address_from_entity(row));
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_create",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(UserWithAddresses {
        user: user_from_entity(user),
        addresses,
    })
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn count_by_user(rows: Vec<(Uuid, i64)>) -> HashMap<Uuid, u64> {
    rows.into_iter()
        .map(|(id, count)| (id, count.max(0) as u64))
        .collect()
}

pub fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        email: model.email,
        name: model.name,
        image: model.image,
        role: model.role,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn address_from_entity(model: AddressModel) -> Address {
    Address {
        id: model.id,
        user_id: model.user_id,
        name: model.name,
        line1: model.line1,
        line2: model.line2,
        city: model.city,
        state: model.state,
        postal_code: model.postal_code,
        country: model.country,
        is_default: model.is_default,
    }
}
