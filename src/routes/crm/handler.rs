use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, Uri},
    response::IntoResponse,
};

use crate::{
    AppState,
    auth::{BitrixAuth, BitrixCredentials, CredentialExtractor, CredentialRequest, Session},
    bitrix::{CrmCompany, normalize_domain},
    cache::{
        CacheOptions,
        keys::{TAG_COMPANIES, bitrix_companies_key, bitrix_portal_tag, company_detail_key},
    },
    error::AppError,
    result::ok,
    routes::{cache_header, company::Company},
};

use super::model::{SyncCompanyRequest, company_add_params, company_list_params};

/// Normalized portal domain of `credentials`, which must be the portal the
/// session was issued for.
fn session_portal(
    state: &AppState,
    session: &Session,
    credentials: &BitrixCredentials,
) -> Result<String, AppError> {
    let domain = normalize_domain(&credentials.domain)?;
    if state.sessions.bypass_enabled() {
        return Ok(domain);
    }

    match normalize_domain(&session.bitrix_domain) {
        Ok(own) if own == domain => Ok(domain),
        _ => {
            tracing::warn!(
                user_id = %session.user_id,
                session_domain = %session.bitrix_domain,
                domain = %domain,
                "Bitrix credentials do not match the session portal"
            );
            Err(AppError::CredentialsMissing)
        }
    }
}

/// Companies as the CRM sees them, cached per portal and token.
pub async fn list_companies(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    BitrixAuth(credentials): BitrixAuth,
) -> Result<impl IntoResponse, AppError> {
    let domain = session_portal(&state, &session, &credentials)?;

    let bitrix = state.bitrix.clone();
    let creds = credentials.clone();
    let cached = state
        .cache
        .get_cached_data(
            &bitrix_companies_key(&domain, &credentials.access_token),
            || async move {
                bitrix
                    .call::<Vec<CrmCompany>>(&creds, "crm.company.list", &company_list_params())
                    .await
            },
            CacheOptions::default().tag(bitrix_portal_tag(&domain)),
        )
        .await?;

    Ok((cache_header(cached.status), ok(cached.value)))
}

/// Pushes a local company to the CRM and records the CRM id.
pub async fn sync_company(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    uri: Uri,
    Json(req): Json<SyncCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let credentials = CredentialExtractor::default().require(&CredentialRequest {
        headers: &headers,
        body: Some(&req.credentials),
        uri: &uri,
    })?;
    let domain = session_portal(&state, &session, &credentials)?;

    let company = Company::find_by_id(&state.pool, req.company_id)
        .await?
        .ok_or(AppError::NotFound("company"))?;

    if company.bitrix_company_id.is_some() {
        tracing::debug!(company_id = %company.id, "Company already synced");
        return Ok(ok(company));
    }

    let bitrix_id: i64 = state
        .bitrix
        .call(&credentials, "crm.company.add", &company_add_params(&company))
        .await?;
    let company = Company::set_bitrix_id(&state.pool, company.id, bitrix_id).await?;

    tracing::info!(company_id = %company.id, bitrix_id, "Company synced to Bitrix");

    state.cache.invalidate(&company_detail_key(&company.id)).await;
    state.cache.invalidate_tag(TAG_COMPANIES).await;
    state.cache.invalidate_tag(&bitrix_portal_tag(&domain)).await;

    Ok(ok(company))
}
