//! JWT-backed sessions.
//!
//! A session is a signed token carrying the user id. It is accepted from the
//! session cookie or from an `Authorization: Bearer` header. Tokens close to
//! expiry are re-issued and handed back as a `Set-Cookie` value so the guard
//! can propagate the refreshed cookie downstream.

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::AppResult,
    middleware::guard::{ResolvedSession, Session, SessionProvider},
};

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct JwtSessions {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    refresh_window: Duration,
    cookie_name: String,
}

impl JwtSessions {
    pub fn new(secret: &str, ttl_minutes: i64, refresh_minutes: i64, cookie_name: impl Into<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
            refresh_window: Duration::minutes(refresh_minutes),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.session_secret,
            config.session_ttl_minutes,
            config.session_refresh_minutes,
            config.session_cookie.clone(),
        )
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<IssuedSession> {
        self.issue_at(user_id, Utc::now())
    }

    pub fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> anyhow::Result<IssuedSession> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("Failed to set expiration"))?;
        let claims = SessionClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(IssuedSession { token, expires_at })
    }

    /// Returns `None` for tokens that are malformed, forged or expired.
    pub fn verify(&self, token: &str) -> Option<Session> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let decoded = decode::<SessionClaims>(token, &self.decoding, &validation).ok()?;
        let user_id = Uuid::parse_str(&decoded.claims.sub).ok()?;
        let expires_at = DateTime::<Utc>::from_timestamp(decoded.claims.exp, 0)?;
        Some(Session { user_id, expires_at })
    }

    pub fn token_from_headers<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        if let Some(bearer) = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
        {
            return Some(bearer);
        }

        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }

    pub fn cookie(&self, session: &IssuedSession) -> anyhow::Result<HeaderValue> {
        let max_age = (session.expires_at - Utc::now()).num_seconds().max(0);
        let value = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name, session.token, max_age
        );
        Ok(HeaderValue::from_str(&value)?)
    }

    pub fn clear_cookie(&self) -> anyhow::Result<HeaderValue> {
        let value = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.cookie_name);
        Ok(HeaderValue::from_str(&value)?)
    }

    pub fn needs_refresh(&self, session: &Session, now: DateTime<Utc>) -> bool {
        session.expires_at - now <= self.refresh_window
    }
}

#[async_trait]
impl SessionProvider for JwtSessions {
    async fn resolve(&self, headers: &HeaderMap) -> AppResult<Option<ResolvedSession>> {
        let Some(token) = self.token_from_headers(headers) else {
            return Ok(None);
        };
        let Some(session) = self.verify(token) else {
            tracing::debug!("session token rejected");
            return Ok(None);
        };

        let mut set_cookies = Vec::new();
        if self.needs_refresh(&session, Utc::now()) {
            let refreshed = self.issue(session.user_id)?;
            set_cookies.push(self.cookie(&refreshed)?);
            tracing::debug!(user_id = %session.user_id, "session refreshed");
            return Ok(Some(ResolvedSession {
                session: Session {
                    user_id: session.user_id,
                    expires_at: refreshed.expires_at,
                },
                set_cookies,
            }));
        }

        Ok(Some(ResolvedSession {
            session,
            set_cookies,
        }))
    }
}
