use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    session::JwtSessions,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<JwtSessions>,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, config: AppConfig) -> Self {
        let sessions = Arc::new(JwtSessions::from_config(&config));
        Self {
            pool,
            orm,
            config: Arc::new(config),
            sessions,
        }
    }
}
