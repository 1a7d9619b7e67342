use axum::response::IntoResponse;
use chrono::Utc;
use serde::Serialize;

use crate::{cache::CacheStatus, result::ok};

pub mod auth;
pub mod company;
pub mod crm;
pub mod property;

/// `X-Cache: HIT|MISS` so clients can tell which path served them.
pub(crate) fn cache_header(status: CacheStatus) -> [(&'static str, &'static str); 1] {
    [("x-cache", status.as_str())]
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: i64,
}

pub async fn health() -> impl IntoResponse {
    ok(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}
