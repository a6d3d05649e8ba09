//! Request-time route protection.
//!
//! Requests whose path starts with a configured prefix need a session and a
//! permitted role. The decision itself is [`GuardConfig::decide_for`], a pure
//! function; [`access_guard`] feeds it from the injected [`SessionProvider`]
//! and [`RoleLookup`] capabilities. Anything ambiguous denies.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use url::form_urlencoded;
use uuid::Uuid;

use crate::{config::AppConfig, error::AppResult, models::Role};

/// An authenticated caller, as resolved by a [`SessionProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub session: Session,
    /// Cookies the provider wants written back on the response.
    pub set_cookies: Vec<HeaderValue>,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> AppResult<Option<ResolvedSession>>;
}

#[async_trait]
pub trait RoleLookup: Send + Sync {
    /// `Ok(None)` when the user row does not exist.
    async fn role_of(&self, user_id: Uuid) -> AppResult<Option<Role>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedRoute {
    pub prefix: String,
    pub roles: Vec<Role>,
}

impl ProtectedRoute {
    pub fn new(prefix: impl Into<String>, roles: impl Into<Vec<Role>>) -> Self {
        Self {
            prefix: prefix.into(),
            roles: roles.into(),
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Ordered prefix table. The first matching prefix wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProtectedRoutes(Vec<ProtectedRoute>);

impl ProtectedRoutes {
    pub fn new(routes: Vec<ProtectedRoute>) -> Self {
        Self(routes)
    }

    pub fn storefront_defaults() -> Self {
        Self(vec![
            ProtectedRoute::new("/admin", [Role::Admin]),
            ProtectedRoute::new("/account", [Role::User, Role::Admin]),
            ProtectedRoute::new("/checkout", [Role::User, Role::Admin]),
        ])
    }

    /// Parses `"/admin=ADMIN;/account=USER,ADMIN"`.
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        let mut routes = Vec::new();
        for entry in value.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let (prefix, roles) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("missing '=' in protected route: {entry}"))?;
            let prefix = prefix.trim();
            if !prefix.starts_with('/') {
                anyhow::bail!("protected route prefix must start with '/': {prefix}");
            }
            let roles = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(|r| r.parse::<Role>().map_err(anyhow::Error::msg))
                .collect::<anyhow::Result<Vec<_>>>()?;
            if roles.is_empty() {
                anyhow::bail!("protected route {prefix} lists no roles");
            }
            routes.push(ProtectedRoute::new(prefix, roles));
        }
        Ok(Self(routes))
    }

    pub fn match_path(&self, path: &str) -> Option<&ProtectedRoute> {
        self.0.iter().find(|route| path.starts_with(&route.prefix))
    }

    pub fn routes(&self) -> &[ProtectedRoute] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectTo(String),
}

#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub routes: ProtectedRoutes,
    pub login_path: String,
    pub unauthorized_path: String,
}

impl GuardConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            routes: config.protected_routes.clone(),
            login_path: config.login_path.clone(),
            unauthorized_path: config.unauthorized_path.clone(),
        }
    }

    pub fn login_location(&self, return_to: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("redirectTo", return_to)
            .finish();
        format!("{}?{}", self.login_path, query)
    }

    /// `role` is the outcome of the role lookup: `None` covers both a
    /// missing user row and a failed lookup.
    pub fn decide(&self, path: &str, session: Option<&Session>, role: Option<Role>) -> Decision {
        match self.routes.match_path(path) {
            Some(route) => self.decide_for(route, path, session, role),
            None => Decision::Allow,
        }
    }

    pub fn decide_for(
        &self,
        route: &ProtectedRoute,
        path: &str,
        session: Option<&Session>,
        role: Option<Role>,
    ) -> Decision {
        if session.is_none() {
            return Decision::RedirectTo(self.login_location(path));
        }
        match role {
            Some(role) if route.permits(role) => Decision::Allow,
            _ => Decision::RedirectTo(self.unauthorized_path.clone()),
        }
    }
}

#[derive(Clone)]
pub struct AccessGuard {
    pub config: GuardConfig,
    sessions: Arc<dyn SessionProvider>,
    roles: Arc<dyn RoleLookup>,
}

impl AccessGuard {
    pub fn new(
        config: GuardConfig,
        sessions: Arc<dyn SessionProvider>,
        roles: Arc<dyn RoleLookup>,
    ) -> Self {
        Self {
            config,
            sessions,
            roles,
        }
    }
}

/// axum middleware; install with `from_fn_with_state(Arc<AccessGuard>, access_guard)`.
pub async fn access_guard(
    State(guard): State<Arc<AccessGuard>>,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    let Some(route) = guard.config.routes.match_path(&path) else {
        return next.run(req).await;
    };

    let resolved = match guard.sessions.resolve(req.headers()).await {
        Ok(resolved) => resolved,
        Err(err) => {
            tracing::warn!(error = %err, path = %path, "session resolution failed");
            None
        }
    };

    let role = match &resolved {
        Some(resolved) => match guard.roles.role_of(resolved.session.user_id).await {
            Ok(role) => role,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    user_id = %resolved.session.user_id,
                    "role lookup failed"
                );
                None
            }
        },
        None => None,
    };

    let decision = guard
        .config
        .decide_for(route, &path, resolved.as_ref().map(|r| &r.session), role);

    match decision {
        Decision::RedirectTo(location) => {
            tracing::info!(path = %path, location = %location, "access denied");
            Redirect::temporary(&location).into_response()
        }
        Decision::Allow => {
            let set_cookies = match resolved {
                Some(resolved) => {
                    req.extensions_mut().insert(resolved.session);
                    resolved.set_cookies
                }
                None => Vec::new(),
            };
            let mut response = next.run(req).await;
            for cookie in set_cookies {
                response.headers_mut().append(header::SET_COOKIE, cookie);
            }
            response
        }
    }
}
