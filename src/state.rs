// src/state.rs

use std::sync::Arc;

use crate::config::Config;
use crate::services::{ai::AiTutor, pdf::PageRenderer, youtube::VideoSearch};
use axum::extract::FromRef;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub tutor: Arc<dyn AiTutor>,
    pub videos: Arc<dyn VideoSearch>,
    pub renderer: Arc<dyn PageRenderer>,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
