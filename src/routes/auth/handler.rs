use axum::{
    extract::{Extension, Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;

use crate::{
    AppState,
    auth::{BitrixCredentials, Session, clear_session_cookie, session_cookie},
    bitrix::BitrixUser,
    error::{AppError, AuthFailureReason},
    result::ok,
};

use super::model::{CallbackQuery, LogoutResponse, OAUTH_STATE_COOKIE, StartQuery};

/// Sends the broker to their portal's consent page.
pub async fn start(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<StartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let oauth_state = uuid::Uuid::new_v4().simple().to_string();
    let url = state.bitrix.authorize_url(&query.domain, &oauth_state)?;

    let state_cookie = Cookie::build((OAUTH_STATE_COOKIE, oauth_state))
        .path("/")
        .http_only(true)
        .secure(state.config.is_production())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(10))
        .build();

    Ok((jar.add(state_cookie), Redirect::to(url.as_str())))
}

/// Completes the handshake and issues the session cookie.
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, AppError> {
    let expected = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    if expected.is_none() || expected != query.state {
        tracing::warn!(domain = %query.domain, "OAuth state mismatch");
        return Err(AppError::Unauthorized(AuthFailureReason::Invalid));
    }

    let token = state.bitrix.exchange_code(&query.code).await?;
    let credentials = BitrixCredentials {
        access_token: token.access_token,
        domain: query.domain,
    };
    let user: BitrixUser = state
        .bitrix
        .call(&credentials, "user.current", &json!({}))
        .await?;

    let session = Session::issue(
        user.id.clone(),
        user.display_name(),
        user.email.clone().unwrap_or_default(),
        credentials.domain,
    );
    let value = session
        .encode()
        .map_err(|e| AppError::Internal(format!("failed to encode session: {}", e)))?;

    tracing::info!(user_id = %session.user_id, domain = %session.bitrix_domain, "Broker logged in");

    let jar = jar
        .remove(Cookie::build(OAUTH_STATE_COOKIE).path("/"))
        .add(session_cookie(
            value,
            state.sessions.max_age(),
            state.config.is_production(),
        ));
    Ok((jar, Redirect::to("/")))
}

pub async fn session(Extension(session): Extension<Session>) -> impl IntoResponse {
    ok(session)
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(clear_session_cookie()),
        ok(LogoutResponse { logged_out: true }),
    )
}
