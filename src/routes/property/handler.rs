use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::Session,
    cache::{
        CacheOptions,
        keys::{TAG_PROPERTIES, company_properties_key},
    },
    error::AppError,
    result::ok,
    routes::{cache_header, company::Company},
};

use super::model::{CreatePropertyRequest, Property};

pub async fn list_by_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let pool = state.pool.clone();
    let cached = state
        .cache
        .get_cached_data(
            &company_properties_key(&company_id),
            || async move { Property::list_by_company(&pool, company_id).await },
            CacheOptions::default().tag(TAG_PROPERTIES),
        )
        .await?;

    Ok((cache_header(cached.status), ok(cached.value)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreatePropertyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = req.validate()?;

    if Company::find_by_id(&state.pool, req.company_id).await?.is_none() {
        return Err(AppError::NotFound("company"));
    }

    let property = Property::create(&state.pool, req, &session.user_id).await?;
    state.cache.invalidate_tag(TAG_PROPERTIES).await;

    Ok(ok(property))
}
