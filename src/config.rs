use std::env;

use anyhow::Context;

use crate::middleware::guard::ProtectedRoutes;

const DEFAULT_PROTECTED_ROUTES: &str = "/admin=ADMIN;/account=USER,ADMIN;/checkout=USER,ADMIN";

/// How `create_order` prices line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPricing {
    /// Trust the per-item price sent by the caller.
    Client,
    /// Re-price from the catalog and require enough inventory.
    Catalog,
}

impl OrderPricing {
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "catalog" => Ok(Self::Catalog),
            other => anyhow::bail!("unknown ORDER_PRICING value: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub session_secret: String,
    pub session_ttl_minutes: i64,
    pub session_refresh_minutes: i64,
    pub session_cookie: String,
    pub login_path: String,
    pub unauthorized_path: String,
    pub protected_routes: ProtectedRoutes,
    pub order_pricing: OrderPricing,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let session_secret = env::var("SESSION_SECRET").context("SESSION_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let session_ttl_minutes = env_i64("SESSION_TTL_MINUTES", 60);
        let session_refresh_minutes = env_i64("SESSION_REFRESH_MINUTES", 10);
        let session_cookie = env::var("SESSION_COOKIE").unwrap_or_else(|_| "sf_session".to_string());
        let login_path = env::var("LOGIN_PATH").unwrap_or_else(|_| "/auth/login".to_string());
        let unauthorized_path =
            env::var("UNAUTHORIZED_PATH").unwrap_or_else(|_| "/unauthorized".to_string());
        let protected_routes = ProtectedRoutes::parse(
            &env::var("PROTECTED_ROUTES").unwrap_or_else(|_| DEFAULT_PROTECTED_ROUTES.to_string()),
        )
        .context("invalid PROTECTED_ROUTES")?;
        let order_pricing = match env::var("ORDER_PRICING") {
            Ok(value) => OrderPricing::parse(&value)?,
            Err(_) => OrderPricing::Client,
        };

        Ok(Self {
            port,
            database_url,
            host,
            session_secret,
            session_ttl_minutes,
            session_refresh_minutes,
            session_cookie,
            login_path,
            unauthorized_path,
            protected_routes,
            order_pricing,
        })
    }

    /// Defaults for everything except the connection string and secret.
    pub fn with_defaults(database_url: impl Into<String>, session_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            session_secret: session_secret.into(),
            session_ttl_minutes: 60,
            session_refresh_minutes: 10,
            session_cookie: "sf_session".to_string(),
            login_path: "/auth/login".to_string(),
            unauthorized_path: "/unauthorized".to_string(),
            protected_routes: ProtectedRoutes::storefront_defaults(),
            order_pricing: OrderPricing::Client,
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
