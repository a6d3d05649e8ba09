use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::guard::{RoleLookup, Session, SessionProvider},
    models::Role,
    services::user_service::UserRoles,
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

pub fn ensure_role(user: &AuthUser, role: Role) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, Role::Admin)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // The access guard may already have resolved the session.
        let session = match parts.extensions.get::<Session>() {
            Some(session) => session.clone(),
            None => state
                .sessions
                .resolve(&parts.headers)
                .await?
                .map(|resolved| resolved.session)
                .ok_or(AppError::Unauthorized)?,
        };

        let role = UserRoles::new(state.orm.clone())
            .role_of(session.user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            user_id: session.user_id,
            role,
        })
    }
}
