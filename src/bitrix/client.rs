use reqwest::Url;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

use super::model::OAuthToken;
use crate::auth::BitrixCredentials;
use crate::config::BitrixConfig;

const OAUTH_TOKEN_URL: &str = "https://oauth.bitrix.info/oauth/token/";

#[derive(Debug, thiserror::Error)]
pub enum BitrixError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{code}: {description}")]
    Api { code: String, description: String },
    #[error("invalid portal domain: {0}")]
    InvalidDomain(String),
    #[error("oauth client is not configured")]
    NotConfigured,
}

/// Either `{result}` or `{error, error_description}`.
#[derive(Debug, Deserialize)]
struct RestEnvelope<T> {
    result: Option<T>,
    error: Option<String>,
    error_description: Option<String>,
}

impl<T> RestEnvelope<T> {
    fn into_result(self) -> Result<T, BitrixError> {
        match (self.result, self.error) {
            (_, Some(code)) => Err(BitrixError::Api {
                code,
                description: self.error_description.unwrap_or_default(),
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(BitrixError::Api {
                code: "EMPTY_RESPONSE".into(),
                description: "response carried neither result nor error".into(),
            }),
        }
    }
}

#[derive(Clone)]
pub struct BitrixClient {
    http: reqwest::Client,
    config: BitrixConfig,
    token_url: Option<Url>,
    /// Replaces `https://<domain>/` for REST calls when set.
    rest_base: Option<Url>,
}

impl BitrixClient {
    pub fn new(config: BitrixConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token_url: None,
            rest_base: None,
        }
    }

    /// Sends the token exchange and every REST call to `base` instead of
    /// the public OAuth server and the caller's portal.
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.token_url = base.join("oauth/token/").ok();
        self.rest_base = Some(base);
        self
    }

    fn client_pair(&self) -> Result<(&str, &str), BitrixError> {
        match (&self.config.client_id, &self.config.client_secret) {
            (Some(id), Some(secret)) => Ok((id.as_str(), secret.as_str())),
            _ => Err(BitrixError::NotConfigured),
        }
    }

    /// Portal page the broker is sent to for consent.
    pub fn authorize_url(&self, domain: &str, state: &str) -> Result<Url, BitrixError> {
        let (client_id, _) = self.client_pair()?;
        let domain = normalize_domain(domain)?;

        let mut params = vec![("client_id", client_id), ("state", state)];
        if let Some(redirect_uri) = self.config.redirect_uri.as_deref() {
            params.push(("redirect_uri", redirect_uri));
        }

        Url::parse_with_params(&format!("https://{}/oauth/authorize/", domain), &params)
            .map_err(|_| BitrixError::InvalidDomain(domain))
    }

    pub async fn exchange_code(&self, code: &str) -> Result<OAuthToken, BitrixError> {
        let (client_id, client_secret) = self.client_pair()?;

        let response = self
            .http
            .get(
                self.token_url
                    .as_ref()
                    .map_or(OAUTH_TOKEN_URL, Url::as_str),
            )
            .query(&[
                ("grant_type", "authorization_code"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("code", code),
            ])
            .send()
            .await?;

        let body: Value = response.json().await?;
        if let Some(code) = body.get("error").and_then(Value::as_str) {
            return Err(BitrixError::Api {
                code: code.to_string(),
                description: body
                    .get("error_description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        serde_json::from_value(body).map_err(|e| BitrixError::Api {
            code: "INVALID_TOKEN_RESPONSE".into(),
            description: e.to_string(),
        })
    }

    /// Calls REST `method` on the caller's portal.
    pub async fn call<T: DeserializeOwned>(
        &self,
        credentials: &BitrixCredentials,
        method: &str,
        params: &Value,
    ) -> Result<T, BitrixError> {
        let url = rest_url(self.rest_base.as_ref(), &credentials.domain, method)?;
        tracing::debug!(method, domain = %credentials.domain, "Calling Bitrix");

        let envelope: RestEnvelope<T> = self
            .http
            .post(url)
            .query(&[("auth", credentials.access_token.as_str())])
            .json(params)
            .send()
            .await?
            .json()
            .await?;

        envelope.into_result().inspect_err(|e| {
            tracing::warn!(method, domain = %credentials.domain, "Bitrix call failed: {}", e);
        })
    }
}

/// Accepts `acme.bitrix24.com` as well as `https://acme.bitrix24.com/`.
pub(crate) fn normalize_domain(domain: &str) -> Result<String, BitrixError> {
    let host = domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_ascii_lowercase();

    let valid = !host.is_empty()
        && host.contains('.')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');

    if valid {
        Ok(host)
    } else {
        Err(BitrixError::InvalidDomain(domain.to_string()))
    }
}

fn rest_url(base: Option<&Url>, domain: &str, method: &str) -> Result<Url, BitrixError> {
    let host = normalize_domain(domain)?;
    let method_ok = !method.is_empty()
        && method
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
    if !method_ok {
        return Err(BitrixError::Api {
            code: "INVALID_METHOD".into(),
            description: method.to_string(),
        });
    }

    let path = format!("rest/{}.json", method);
    let url = match base {
        Some(base) => base.join(&path),
        None => Url::parse(&format!("https://{}/{}", host, path)),
    };
    url.map_err(|_| BitrixError::InvalidDomain(domain.to_string()))
}
