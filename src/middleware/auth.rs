use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{AppState, error::AppError};

/// Resolves the session cookie and makes the [`crate::auth::Session`]
/// available to handlers as an `Extension`.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = state.sessions.resolve(&jar).inspect_err(|reason| {
        tracing::debug!(
            path = %request.uri().path(),
            reason = %reason,
            "Rejecting unauthenticated request"
        );
    })?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
