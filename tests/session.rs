use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{Duration, Utc};
use storefront_api::{middleware::guard::SessionProvider, session::JwtSessions};
use uuid::Uuid;

fn sessions() -> JwtSessions {
    JwtSessions::new("test-secret", 60, 10, "sf_session")
}

#[test]
fn issued_token_verifies_to_same_user() -> anyhow::Result<()> {
    let sessions = sessions();
    let user_id = Uuid::new_v4();
    let issued = sessions.issue(user_id)?;

    let session = sessions.verify(&issued.token).expect("valid token");
    assert_eq!(session.user_id, user_id);
    assert_eq!(session.expires_at.timestamp(), issued.expires_at.timestamp());
    Ok(())
}

#[test]
fn expired_or_forged_tokens_are_rejected() -> anyhow::Result<()> {
    let sessions = sessions();
    let stale = sessions.issue_at(Uuid::new_v4(), Utc::now() - Duration::hours(2))?;
    assert!(sessions.verify(&stale.token).is_none());

    let other = JwtSessions::new("another-secret", 60, 10, "sf_session");
    let forged = other.issue(Uuid::new_v4())?;
    assert!(sessions.verify(&forged.token).is_none());

    assert!(sessions.verify("not-a-jwt").is_none());
    Ok(())
}

#[test]
fn token_is_read_from_bearer_then_cookie() {
    let sessions = sessions();

    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; sf_session=from-cookie"));
    assert_eq!(sessions.token_from_headers(&headers), Some("from-cookie"));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
    assert_eq!(sessions.token_from_headers(&headers), Some("from-header"));

    assert_eq!(sessions.token_from_headers(&HeaderMap::new()), None);
}

#[tokio::test]
async fn fresh_session_is_not_refreshed() -> anyhow::Result<()> {
    let sessions = sessions();
    let issued = sessions.issue(Uuid::new_v4())?;
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, format!("Bearer {}", issued.token).parse()?);

    let resolved = sessions.resolve(&headers).await?.expect("session");
    assert!(resolved.set_cookies.is_empty());
    Ok(())
}

#[tokio::test]
async fn session_near_expiry_is_refreshed() -> anyhow::Result<()> {
    let sessions = sessions();
    let user_id = Uuid::new_v4();
    // 55 minutes into a 60 minute session, inside the 10 minute window.
    let issued = sessions.issue_at(user_id, Utc::now() - Duration::minutes(55))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, format!("sf_session={}", issued.token).parse()?);

    let resolved = sessions.resolve(&headers).await?.expect("session");
    assert_eq!(resolved.session.user_id, user_id);
    assert!(resolved.session.expires_at > issued.expires_at);
    assert_eq!(resolved.set_cookies.len(), 1);
    let cookie = resolved.set_cookies[0].to_str()?;
    assert!(cookie.starts_with("sf_session="));
    assert!(cookie.contains("HttpOnly"));
    Ok(())
}

#[tokio::test]
async fn missing_token_resolves_to_none() -> anyhow::Result<()> {
    assert!(sessions().resolve(&HeaderMap::new()).await?.is_none());
    Ok(())
}
