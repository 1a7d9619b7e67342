use axum::{
    Router,
    routing::{get, post},
};
use config::Config;
use sqlx::PgPool;

use crate::{
    auth::SessionResolver,
    bitrix::BitrixClient,
    cache::Cache,
    middleware::{auth_middleware, log_errors},
};

pub mod auth;
pub mod bitrix;
pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod result;
pub mod routes;

/// Schema applied at startup; every statement is idempotent.
pub const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub cache: Cache,
    pub sessions: SessionResolver,
    pub bitrix: BitrixClient,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, cache: Cache) -> Self {
        Self {
            sessions: SessionResolver::new(config.session_config()),
            bitrix: BitrixClient::new(config.bitrix.clone()),
            pool,
            config,
            cache,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health))
        .route("/auth/bitrix/start", get(routes::auth::start))
        .route("/auth/bitrix/callback", get(routes::auth::callback))
        .route("/auth/logout", post(routes::auth::logout));

    let protected_routes = Router::new()
        .route("/auth/session", get(routes::auth::session))
        .route(
            "/companies",
            get(routes::company::list).post(routes::company::create),
        )
        .route("/companies/{id}", get(routes::company::find_by_id))
        .route(
            "/companies/{id}/properties",
            get(routes::property::list_by_company),
        )
        .route("/properties", post(routes::property::create))
        .route("/crm/companies", get(routes::crm::list_companies))
        .route("/crm/companies/sync", post(routes::crm::sync_company))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = public_routes.merge(protected_routes);
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        api
    } else {
        Router::new().nest(base, api)
    };

    let router = router.layer(axum::middleware::from_fn(log_errors));

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding permissive CORS layer for development");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
