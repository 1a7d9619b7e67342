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
        keys::{TAG_COMPANIES, companies_list_key, company_detail_key},
    },
    error::AppError,
    result::ok,
    routes::cache_header,
};

use super::model::{Company, CreateCompanyRequest};

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let pool = state.pool.clone();
    let cached = state
        .cache
        .get_cached_data(
            &companies_list_key(),
            || async move { Company::list(&pool).await },
            CacheOptions::default().tag(TAG_COMPANIES),
        )
        .await?;

    Ok((cache_header(cached.status), ok(cached.value)))
}

pub async fn find_by_id(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let pool = state.pool.clone();
    let cached = state
        .cache
        .get_cached_data(
            &company_detail_key(&company_id),
            || async move { Company::find_by_id(&pool, company_id).await },
            CacheOptions::default().tag(TAG_COMPANIES),
        )
        .await?;

    let company = cached.value.ok_or(AppError::NotFound("company"))?;
    Ok((cache_header(cached.status), ok(company)))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let req = req.validate()?;
    let company = Company::create(&state.pool, req, &session.user_id)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("a company with this document already exists")
            }
            other => AppError::Database(other),
        })?;

    state.cache.invalidate_tag(TAG_COMPANIES).await;
    Ok(ok(company))
}
