use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::{
    audit,
    dto::auth::{LoginRequest, LoginResponse},
    entity::users::{Column, Entity as Users},
    error::{AppError, AppResult},
    session::IssuedSession,
    state::AppState,
};

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<(LoginResponse, IssuedSession)> {
    let LoginRequest { email, password } = payload;
    let user = Users::find()
        .filter(Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::validation("Invalid email or password"))?;

    // Accounts created without a password cannot log in.
    let stored = user
        .password_hash
        .as_deref()
        .ok_or_else(|| AppError::validation("Invalid email or password"))?;

    let parsed_hash = PasswordHash::new(stored)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::validation("Invalid email or password"));
    }

    let issued = state.sessions.issue(user.id)?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok((
        LoginResponse {
            token: issued.token.clone(),
            expires_at: issued.expires_at,
        },
        issued,
    ))
}
