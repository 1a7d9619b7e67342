use std::env;
use std::time::Duration;

use crate::auth::SessionConfig;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub app_env: String,
    pub dev_auth_bypass: bool,
    pub session_max_age_secs: u64,
    pub cache_default_ttl_secs: u64,
    pub bitrix: BitrixConfig,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct BitrixConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

const DEFAULT_SESSION_MAX_AGE_DAYS: u64 = 7;
const SECS_PER_DAY: u64 = 24 * 3600;

/// `SESSION_MAX_AGE_DAYS` (`7` or `7d`) in seconds. Saturates instead of
/// overflowing on absurd values.
fn session_max_age_secs(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().trim_end_matches('d').parse::<u64>().ok())
        .unwrap_or(DEFAULT_SESSION_MAX_AGE_DAYS)
        .saturating_mul(SECS_PER_DAY)
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            dev_auth_bypass: env::var("DEV_AUTH_BYPASS")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            session_max_age_secs: session_max_age_secs(
                env::var("SESSION_MAX_AGE_DAYS").ok().as_deref(),
            ),
            cache_default_ttl_secs: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            bitrix: BitrixConfig {
                client_id: env::var("BITRIX_CLIENT_ID").ok(),
                client_secret: env::var("BITRIX_CLIENT_SECRET").ok(),
                redirect_uri: env::var("BITRIX_REDIRECT_URI").ok(),
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::from_secs(self.session_max_age_secs)
    }

    pub fn cache_default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_default_ttl_secs)
    }

    /// The bypass is never honored in production, whatever the flag says.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            dev_bypass: self.dev_auth_bypass && !self.is_production(),
            max_age: self.session_max_age(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(app_env: &str, bypass: bool) -> Config {
        Config {
            database_url: "postgres://localhost/beehouse".into(),
            redis_url: "redis://127.0.0.1/".into(),
            server_host: "127.0.0.1".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            app_env: app_env.into(),
            dev_auth_bypass: bypass,
            session_max_age_secs: 7 * 24 * 3600,
            cache_default_ttl_secs: 300,
            bitrix: BitrixConfig::default(),
        }
    }

    #[test]
    fn bypass_is_dropped_in_production() {
        assert!(config("development", true).session_config().dev_bypass);
        assert!(!config("production", true).session_config().dev_bypass);
        assert!(!config("PRODUCTION", true).session_config().dev_bypass);
    }

    #[test]
    fn session_max_age_parses_days() {
        assert_eq!(session_max_age_secs(None), 7 * SECS_PER_DAY);
        assert_eq!(session_max_age_secs(Some("30")), 30 * SECS_PER_DAY);
        assert_eq!(session_max_age_secs(Some("14d")), 14 * SECS_PER_DAY);
        assert_eq!(session_max_age_secs(Some("soon")), 7 * SECS_PER_DAY);
    }

    #[test]
    fn huge_session_max_age_saturates() {
        assert_eq!(session_max_age_secs(Some("18446744073709551615")), u64::MAX);
        assert_eq!(session_max_age_secs(Some("999999999999999")), u64::MAX);
    }

    #[test]
    fn session_max_age_is_seven_days_by_default() {
        let cfg = config("development", false).session_config();
        assert_eq!(cfg.max_age, Duration::from_millis(604_800_000));
    }
}
