use axum::{
    extract::{FromRequestParts, Query},
    http::{HeaderMap, Uri, request::Parts},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const TOKEN_HEADER: &str = "x-bitrix-token";
pub const DOMAIN_HEADER: &str = "x-bitrix-domain";

/// Token and portal domain used to call Bitrix24 on the caller's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BitrixCredentials {
    pub access_token: String,
    pub domain: String,
}

/// A possibly partial credential pair. Also the shape of the body and query
/// fallbacks (`accessToken`, `domain`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialFields {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

impl CredentialFields {
    fn is_complete(&self) -> bool {
        self.access_token.is_some() && self.domain.is_some()
    }

    /// Fills whatever is still missing from `other`. Returns true if any
    /// field was taken from it.
    fn fill_from(&mut self, other: CredentialFields) -> bool {
        let mut filled = false;
        if self.access_token.is_none() {
            if let Some(token) = non_empty(other.access_token) {
                self.access_token = Some(token);
                filled = true;
            }
        }
        if self.domain.is_none() {
            if let Some(domain) = non_empty(other.domain) {
                self.domain = Some(domain);
                filled = true;
            }
        }
        filled
    }

    fn into_credentials(self) -> Option<BitrixCredentials> {
        Some(BitrixCredentials {
            access_token: self.access_token?,
            domain: self.domain?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Everything a tier may read from.
pub struct CredentialRequest<'a> {
    pub headers: &'a HeaderMap,
    pub body: Option<&'a CredentialFields>,
    pub uri: &'a Uri,
}

struct Tier {
    name: &'static str,
    deprecated: bool,
    read: fn(&CredentialRequest<'_>) -> CredentialFields,
}

fn from_headers(req: &CredentialRequest<'_>) -> CredentialFields {
    let header = |name: &str| {
        req.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    CredentialFields {
        access_token: header(TOKEN_HEADER),
        domain: header(DOMAIN_HEADER),
    }
}

fn from_body(req: &CredentialRequest<'_>) -> CredentialFields {
    req.body.cloned().unwrap_or_default()
}

fn from_query(req: &CredentialRequest<'_>) -> CredentialFields {
    Query::<CredentialFields>::try_from_uri(req.uri)
        .map(|Query(fields)| fields)
        .unwrap_or_default()
}

/// Headers first, then body, then the deprecated query string.
const STANDARD_TIERS: &[Tier] = &[
    Tier {
        name: "headers",
        deprecated: false,
        read: from_headers,
    },
    Tier {
        name: "body",
        deprecated: false,
        read: from_body,
    },
    Tier {
        name: "query",
        deprecated: true,
        read: from_query,
    },
];

#[derive(Debug)]
pub struct Extraction {
    pub credentials: Option<BitrixCredentials>,
    /// Set when a deprecated tier supplied at least one field.
    pub deprecated_tier: Option<&'static str>,
}

/// Tries each tier in order, merging partial results left to right.
#[derive(Clone, Copy)]
pub struct CredentialExtractor {
    tiers: &'static [Tier],
}

impl Default for CredentialExtractor {
    fn default() -> Self {
        Self {
            tiers: STANDARD_TIERS,
        }
    }
}

impl CredentialExtractor {
    pub fn run(&self, req: &CredentialRequest<'_>) -> Extraction {
        let mut fields = CredentialFields::default();
        let mut deprecated_tier = None;

        for tier in self.tiers {
            if fields.is_complete() {
                break;
            }
            if fields.fill_from((tier.read)(req)) && tier.deprecated {
                deprecated_tier = Some(tier.name);
            }
        }

        if let Some(tier) = deprecated_tier {
            tracing::warn!(
                tier,
                path = %req.uri.path(),
                "Bitrix credentials read from a deprecated source, send X-Bitrix-Token and X-Bitrix-Domain headers instead"
            );
        }

        Extraction {
            credentials: fields.into_credentials(),
            deprecated_tier,
        }
    }

    /// Never fails; absent means the caller is unauthenticated for the CRM.
    pub fn extract(&self, req: &CredentialRequest<'_>) -> Option<BitrixCredentials> {
        self.run(req).credentials
    }

    /// For call sites that cannot proceed without credentials.
    pub fn require(&self, req: &CredentialRequest<'_>) -> Result<BitrixCredentials, AppError> {
        self.extract(req).ok_or(AppError::CredentialsMissing)
    }
}

/// Extractor for bodiless requests: headers, then query string.
pub struct BitrixAuth(pub BitrixCredentials);

impl<S> FromRequestParts<S> for BitrixAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let req = CredentialRequest {
            headers: &parts.headers,
            body: None,
            uri: &parts.uri,
        };
        CredentialExtractor::default().require(&req).map(BitrixAuth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(token: Option<&str>, domain: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(token) = token {
            map.insert(TOKEN_HEADER, HeaderValue::from_str(token).unwrap());
        }
        if let Some(domain) = domain {
            map.insert(DOMAIN_HEADER, HeaderValue::from_str(domain).unwrap());
        }
        map
    }

    fn body(token: Option<&str>, domain: Option<&str>) -> CredentialFields {
        CredentialFields {
            access_token: token.map(str::to_string),
            domain: domain.map(str::to_string),
        }
    }

    fn pair(token: &str, domain: &str) -> BitrixCredentials {
        BitrixCredentials {
            access_token: token.into(),
            domain: domain.into(),
        }
    }

    #[test]
    fn headers_win_over_body_and_query() {
        let headers = headers(Some("tok"), Some("acme.bitrix24.com"));
        let body = body(Some("body-tok"), Some("body.bitrix24.com"));
        let uri: Uri = "/crm?accessToken=q-tok&domain=q.bitrix24.com".parse().unwrap();

        let out = CredentialExtractor::default().run(&CredentialRequest {
            headers: &headers,
            body: Some(&body),
            uri: &uri,
        });

        assert_eq!(out.credentials, Some(pair("tok", "acme.bitrix24.com")));
        assert_eq!(out.deprecated_tier, None);
    }

    #[test]
    fn query_only_fills_both_fields_and_flags_deprecation() {
        let headers = HeaderMap::new();
        let uri: Uri = "/crm?accessToken=tok&domain=acme.bitrix24.com".parse().unwrap();

        let out = CredentialExtractor::default().run(&CredentialRequest {
            headers: &headers,
            body: None,
            uri: &uri,
        });

        assert_eq!(out.credentials, Some(pair("tok", "acme.bitrix24.com")));
        assert_eq!(out.deprecated_tier, Some("query"));
    }

    #[test]
    fn missing_fields_are_merged_across_tiers() {
        let headers = headers(Some("tok"), None);
        let body = body(Some("ignored"), Some("acme.bitrix24.com"));
        let uri: Uri = "/crm".parse().unwrap();

        let out = CredentialExtractor::default().run(&CredentialRequest {
            headers: &headers,
            body: Some(&body),
            uri: &uri,
        });

        assert_eq!(out.credentials, Some(pair("tok", "acme.bitrix24.com")));
        assert_eq!(out.deprecated_tier, None);
    }

    #[test]
    fn missing_domain_is_absent_even_with_token() {
        let headers = headers(Some("tok"), None);
        let uri: Uri = "/crm?accessToken=other".parse().unwrap();
        let req = CredentialRequest {
            headers: &headers,
            body: None,
            uri: &uri,
        };

        assert_eq!(CredentialExtractor::default().extract(&req), None);
        assert!(matches!(
            CredentialExtractor::default().require(&req),
            Err(AppError::CredentialsMissing)
        ));
    }

    #[test]
    fn empty_values_do_not_count() {
        let headers = headers(Some(""), Some("acme.bitrix24.com"));
        let body = body(Some("tok"), None);
        let uri: Uri = "/crm".parse().unwrap();

        let out = CredentialExtractor::default().extract(&CredentialRequest {
            headers: &headers,
            body: Some(&body),
            uri: &uri,
        });

        assert_eq!(out, Some(pair("tok", "acme.bitrix24.com")));
    }

    #[tokio::test]
    async fn bitrix_auth_rejects_without_credentials() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/crm/companies")
            .body(())
            .unwrap()
            .into_parts();

        let rejection = BitrixAuth::from_request_parts(&mut parts, &()).await.err();
        assert!(matches!(rejection, Some(AppError::CredentialsMissing)));
    }
}
