use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AuthFailureReason;

/// Cookie carrying the encoded [`Session`].
pub const SESSION_COOKIE: &str = "beehouse_session";

/// 7 days.
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_millis(604_800_000);

/// A logged-in broker, as carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub bitrix_domain: String,
    /// Issuance time, milliseconds since epoch.
    pub timestamp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionDecodeError {
    #[error("cookie is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("cookie is not a valid session document: {0}")]
    Json(#[from] serde_json::Error),
}

impl Session {
    /// Stamps a new session with the current time.
    pub fn issue(
        user_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        bitrix_domain: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            email: email.into(),
            bitrix_domain: bitrix_domain.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    fn mock(now_ms: i64) -> Self {
        Self {
            user_id: "dev-user".into(),
            name: "Dev Broker".into(),
            email: "dev@beehouse.local".into(),
            bitrix_domain: "dev.bitrix24.com".into(),
            timestamp: now_ms,
        }
    }

    /// base64(JSON), the cookie value format.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_vec(self).map(|json| STANDARD.encode(json))
    }

    pub fn decode(value: &str) -> Result<Self, SessionDecodeError> {
        let bytes = STANDARD.decode(value.trim())?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Skip cookie inspection and return a fixed development identity.
    pub dev_bypass: bool,
    pub max_age: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dev_bypass: false,
            max_age: DEFAULT_SESSION_MAX_AGE,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionResolver {
    config: SessionConfig,
}

impl SessionResolver {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn max_age(&self) -> Duration {
        self.config.max_age
    }

    pub fn bypass_enabled(&self) -> bool {
        self.config.dev_bypass
    }

    pub fn resolve(&self, jar: &CookieJar) -> Result<Session, AuthFailureReason> {
        self.resolve_at(jar, Utc::now().timestamp_millis())
    }

    pub fn resolve_at(&self, jar: &CookieJar, now_ms: i64) -> Result<Session, AuthFailureReason> {
        if self.config.dev_bypass {
            tracing::debug!("Session bypass enabled, using development identity");
            return Ok(Session::mock(now_ms));
        }

        let cookie = jar.get(SESSION_COOKIE).ok_or(AuthFailureReason::Missing)?;

        let session = Session::decode(cookie.value()).map_err(|e| {
            tracing::debug!("Rejecting session cookie: {}", e);
            AuthFailureReason::Invalid
        })?;

        let age_ms = now_ms.saturating_sub(session.timestamp);
        let max_age_ms = i64::try_from(self.config.max_age.as_millis()).unwrap_or(i64::MAX);
        if age_ms > max_age_ms {
            tracing::debug!(user_id = %session.user_id, age_ms, "Session expired");
            return Err(AuthFailureReason::Expired);
        }

        Ok(session)
    }
}

/// Builds the `Set-Cookie` entry for an encoded session.
pub fn session_cookie(value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(
            i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX),
        ))
        .build()
}

/// Removal entry for the session cookie; must match the path it was set on.
pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000_000;

    fn jar_with(value: &str) -> CookieJar {
        CookieJar::new().add(Cookie::new(SESSION_COOKIE, value.to_string()))
    }

    fn session_at(timestamp: i64) -> Session {
        Session {
            user_id: "42".into(),
            name: "Ana Souza".into(),
            email: "ana@acme.com.br".into(),
            bitrix_domain: "acme.bitrix24.com".into(),
            timestamp,
        }
    }

    #[test]
    fn valid_cookie_round_trips() {
        let session = session_at(NOW - 1_000);
        let jar = jar_with(&session.encode().unwrap());

        let resolved = SessionResolver::default().resolve_at(&jar, NOW).unwrap();
        assert_eq!(resolved, session);
    }

    #[test]
    fn cookie_uses_camel_case_fields() {
        let encoded = session_at(NOW).encode().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();
        assert_eq!(json["userId"], "42");
        assert_eq!(json["bitrixDomain"], "acme.bitrix24.com");
        assert_eq!(json["timestamp"], NOW);
    }

    #[test]
    fn missing_cookie() {
        let err = SessionResolver::default()
            .resolve_at(&CookieJar::new(), NOW)
            .unwrap_err();
        assert_eq!(err, AuthFailureReason::Missing);
    }

    #[test]
    fn garbage_cookie_is_invalid() {
        let resolver = SessionResolver::default();
        let values = [
            "%%%not-base64%%%".to_string(),
            STANDARD.encode("{not json"),
            STANDARD.encode("[]"),
        ];
        for value in &values {
            let err = resolver.resolve_at(&jar_with(value), NOW).unwrap_err();
            assert_eq!(err, AuthFailureReason::Invalid, "value: {value}");
        }
    }

    #[test]
    fn exactly_seven_days_is_still_valid() {
        let session = session_at(NOW - 604_800_000);
        let jar = jar_with(&session.encode().unwrap());
        assert!(SessionResolver::default().resolve_at(&jar, NOW).is_ok());
    }

    #[test]
    fn older_than_seven_days_is_expired() {
        let session = session_at(NOW - 604_800_001);
        let jar = jar_with(&session.encode().unwrap());
        let err = SessionResolver::default().resolve_at(&jar, NOW).unwrap_err();
        assert_eq!(err, AuthFailureReason::Expired);
    }

    #[test]
    fn bypass_ignores_cookies() {
        let resolver = SessionResolver::new(SessionConfig {
            dev_bypass: true,
            ..SessionConfig::default()
        });

        let from_empty = resolver.resolve_at(&CookieJar::new(), NOW).unwrap();
        assert_eq!(from_empty.user_id, "dev-user");

        let from_garbage = resolver.resolve_at(&jar_with("garbage"), NOW).unwrap();
        assert_eq!(from_garbage.user_id, "dev-user");
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("abc".into(), DEFAULT_SESSION_MAX_AGE, true);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    }

    #[test]
    fn unbounded_max_age_does_not_wrap() {
        let max_age = Duration::from_secs(u64::MAX);
        let resolver = SessionResolver::new(SessionConfig {
            dev_bypass: false,
            max_age,
        });
        let jar = jar_with(&session_at(0).encode().unwrap());
        assert!(resolver.resolve_at(&jar, NOW).is_ok());

        let cookie = session_cookie("abc".into(), max_age, false);
        assert_eq!(cookie.max_age(), Some(time::Duration::seconds(i64::MAX)));
    }
}
