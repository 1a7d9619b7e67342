// Keys follow `<domain>:<context>[:<id>]`.

use sha2::{Digest, Sha256};
use uuid::Uuid;

pub const TAG_COMPANIES: &str = "companies";
pub const TAG_PROPERTIES: &str = "properties";

const TAG_INDEX_PREFIX: &str = "tag:";

pub fn companies_list_key() -> String {
    "companies:list".to_string()
}

pub fn company_detail_key(company_id: &Uuid) -> String {
    format!("companies:detail:{}", company_id)
}

pub fn company_properties_key(company_id: &Uuid) -> String {
    format!("properties:company:{}", company_id)
}

/// CRM results are cached per portal and per token, so a hit is only served
/// to a caller holding the token the entry was fetched with. The key carries
/// a digest of the token, never the token.
pub fn bitrix_companies_key(domain: &str, access_token: &str) -> String {
    format!(
        "bitrix:{}:companies:{}",
        domain.to_ascii_lowercase(),
        token_digest(access_token)
    )
}

/// Tags every CRM entry of one portal.
pub fn bitrix_portal_tag(domain: &str) -> String {
    format!("bitrix:{}", domain.to_ascii_lowercase())
}

pub fn tag_index_key(tag: &str) -> String {
    format!("{}{}", TAG_INDEX_PREFIX, tag)
}

fn token_digest(access_token: &str) -> String {
    Sha256::digest(access_token.as_bytes())
        .iter()
        .take(16)
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crm_keys_never_carry_the_token() {
        let key = bitrix_companies_key("Acme.Bitrix24.com", "secret-token");
        assert!(key.starts_with("bitrix:acme.bitrix24.com:companies:"));
        assert!(!key.contains("secret-token"));
        assert_eq!(key.len(), "bitrix:acme.bitrix24.com:companies:".len() + 32);
    }

    #[test]
    fn crm_keys_differ_per_token() {
        assert_ne!(
            bitrix_companies_key("acme.bitrix24.com", "a"),
            bitrix_companies_key("acme.bitrix24.com", "b")
        );
        assert_eq!(
            bitrix_companies_key("acme.bitrix24.com", "a"),
            bitrix_companies_key("ACME.bitrix24.com", "a")
        );
    }

    #[test]
    fn tag_index_keys() {
        assert_eq!(tag_index_key(TAG_COMPANIES), "tag:companies");
        assert_eq!(
            tag_index_key(&bitrix_portal_tag("acme.bitrix24.com")),
            "tag:bitrix:acme.bitrix24.com"
        );
    }
}
