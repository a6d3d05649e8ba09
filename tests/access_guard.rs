use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, HeaderValue, Request, StatusCode, header},
    middleware::from_fn_with_state,
    routing::get,
};
use chrono::{Duration, Utc};
use storefront_api::{
    error::{AppError, AppResult},
    middleware::guard::{
        AccessGuard, Decision, GuardConfig, ProtectedRoute, ProtectedRoutes, ResolvedSession,
        RoleLookup, Session, SessionProvider, access_guard,
    },
    models::Role,
};
use tower::ServiceExt;
use url::form_urlencoded;
use uuid::Uuid;

fn guard_config() -> GuardConfig {
    GuardConfig {
        routes: ProtectedRoutes::storefront_defaults(),
        login_path: "/auth/login".to_string(),
        unauthorized_path: "/unauthorized".to_string(),
    }
}

fn session() -> Session {
    Session {
        user_id: Uuid::new_v4(),
        expires_at: Utc::now() + Duration::minutes(30),
    }
}

fn redirect_target(location: &str) -> Option<String> {
    let (_, query) = location.split_once('?')?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "redirectTo")
        .map(|(_, value)| value.into_owned())
}

#[test]
fn anonymous_request_to_admin_goes_to_login_with_return_path() {
    let decision = guard_config().decide("/admin/x", None, None);
    let Decision::RedirectTo(location) = decision else {
        panic!("expected redirect, got {decision:?}");
    };
    assert!(location.starts_with("/auth/login?"));
    assert_eq!(redirect_target(&location).as_deref(), Some("/admin/x"));
}

#[test]
fn user_role_is_refused_on_admin_prefix() {
    let session = session();
    let decision = guard_config().decide("/admin/x", Some(&session), Some(Role::User));
    assert_eq!(decision, Decision::RedirectTo("/unauthorized".to_string()));
}

#[test]
fn admin_role_passes_admin_prefix() {
    let session = session();
    let decision = guard_config().decide("/admin/orders", Some(&session), Some(Role::Admin));
    assert_eq!(decision, Decision::Allow);
}

#[test]
fn missing_role_is_treated_as_unauthorized() {
    let session = session();
    let decision = guard_config().decide("/account", Some(&session), None);
    assert_eq!(decision, Decision::RedirectTo("/unauthorized".to_string()));
}

#[test]
fn unprotected_path_is_allowed_without_session() {
    assert_eq!(guard_config().decide("/other/x", None, None), Decision::Allow);
    assert_eq!(guard_config().decide("/", None, None), Decision::Allow);
}

#[test]
fn prefix_match_is_plain_starts_with() {
    let routes = ProtectedRoutes::storefront_defaults();
    assert!(routes.match_path("/administrator").is_some());
    assert!(routes.match_path("/shop/admin").is_none());
}

#[test]
fn first_matching_prefix_wins() {
    let routes = ProtectedRoutes::new(vec![
        ProtectedRoute::new("/account/admin", [Role::Admin]),
        ProtectedRoute::new("/account", [Role::User, Role::Admin]),
    ]);
    let matched = routes.match_path("/account/admin/reports").map(|r| r.roles.clone());
    assert_eq!(matched, Some(vec![Role::Admin]));
}

#[test]
fn protected_routes_parse_from_env_format() -> anyhow::Result<()> {
    let routes = ProtectedRoutes::parse("/admin=ADMIN; /checkout=USER,ADMIN")?;
    assert_eq!(
        routes.routes(),
        &[
            ProtectedRoute::new("/admin", [Role::Admin]),
            ProtectedRoute::new("/checkout", [Role::User, Role::Admin]),
        ]
    );
    Ok(())
}

#[test]
fn protected_routes_parse_rejects_bad_entries() {
    assert!(ProtectedRoutes::parse("/admin").is_err());
    assert!(ProtectedRoutes::parse("admin=ADMIN").is_err());
    assert!(ProtectedRoutes::parse("/admin=ROOT").is_err());
    assert!(ProtectedRoutes::parse("/admin=").is_err());
}

#[derive(Default)]
struct FakeSessions {
    session: Option<Session>,
    set_cookie: Option<&'static str>,
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl SessionProvider for FakeSessions {
    async fn resolve(&self, _headers: &HeaderMap) -> AppResult<Option<ResolvedSession>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Internal(anyhow::anyhow!("session store down")));
        }
        Ok(self.session.clone().map(|session| ResolvedSession {
            session,
            set_cookies: self
                .set_cookie
                .map(HeaderValue::from_static)
                .into_iter()
                .collect(),
        }))
    }
}

#[derive(Default)]
struct FakeRoles {
    role: Option<Role>,
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl RoleLookup for FakeRoles {
    async fn role_of(&self, _user_id: Uuid) -> AppResult<Option<Role>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::Internal(anyhow::anyhow!("users table unavailable")));
        }
        Ok(self.role)
    }
}

fn app(sessions: Arc<FakeSessions>, roles: Arc<FakeRoles>) -> Router {
    let guard = AccessGuard::new(guard_config(), sessions, roles);
    Router::new()
        .route("/admin/x", get(|| async { "admin" }))
        .route("/other/x", get(|| async { "other" }))
        .layer(from_fn_with_state(Arc::new(guard), access_guard))
}

async fn send(app: Router, path: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn unprotected_path_never_touches_collaborators() {
    let sessions = Arc::new(FakeSessions::default());
    let roles = Arc::new(FakeRoles::default());

    let response = send(app(sessions.clone(), roles.clone()), "/other/x").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(sessions.calls.load(Ordering::SeqCst), 0);
    assert_eq!(roles.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn anonymous_request_is_redirected_to_login() {
    let sessions = Arc::new(FakeSessions::default());
    let roles = Arc::new(FakeRoles::default());

    let response = send(app(sessions.clone(), roles.clone()), "/admin/x").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(redirect_target(location(&response)).as_deref(), Some("/admin/x"));
    assert_eq!(roles.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn user_role_is_redirected_to_unauthorized() {
    let sessions = Arc::new(FakeSessions {
        session: Some(session()),
        ..Default::default()
    });
    let roles = Arc::new(FakeRoles {
        role: Some(Role::User),
        ..Default::default()
    });

    let response = send(app(sessions, roles), "/admin/x").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/unauthorized");
}

#[tokio::test]
async fn allowed_request_carries_refreshed_cookie() {
    let sessions = Arc::new(FakeSessions {
        session: Some(session()),
        set_cookie: Some("sf_session=refreshed; Path=/; HttpOnly"),
        ..Default::default()
    });
    let roles = Arc::new(FakeRoles {
        role: Some(Role::Admin),
        ..Default::default()
    });

    let response = send(app(sessions, roles), "/admin/x").await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok());
    assert_eq!(cookie, Some("sf_session=refreshed; Path=/; HttpOnly"));
}

#[tokio::test]
async fn failing_role_lookup_denies() {
    let sessions = Arc::new(FakeSessions {
        session: Some(session()),
        ..Default::default()
    });
    let roles = Arc::new(FakeRoles {
        fail: true,
        ..Default::default()
    });

    let response = send(app(sessions, roles), "/admin/x").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/unauthorized");
}

#[tokio::test]
async fn failing_session_provider_redirects_to_login() {
    let sessions = Arc::new(FakeSessions {
        fail: true,
        ..Default::default()
    });
    let roles = Arc::new(FakeRoles::default());

    let response = send(app(sessions, roles.clone()), "/admin/x").await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).starts_with("/auth/login?"));
    assert_eq!(roles.calls.load(Ordering::SeqCst), 0);
}
