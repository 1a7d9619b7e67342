use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::auth::CredentialFields;
use crate::routes::company::Company;

/// Body of a sync request. Credentials may travel here when the caller
/// cannot set headers.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCompanyRequest {
    pub company_id: Uuid,
    #[serde(flatten)]
    pub credentials: CredentialFields,
}

pub fn company_list_params() -> Value {
    json!({
        "order": { "TITLE": "ASC" },
        "select": ["ID", "TITLE", "COMPANY_TYPE", "DATE_CREATE"],
    })
}

pub fn company_add_params(company: &Company) -> Value {
    json!({
        "fields": {
            "TITLE": company.name,
            "COMMENTS": format!("Documento: {}", company.document),
            "ORIGINATOR_ID": "beehouse",
            "ORIGIN_ID": company.id.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_request_reads_body_credentials() {
        let id = Uuid::new_v4();
        let req: SyncCompanyRequest = serde_json::from_value(json!({
            "companyId": id,
            "accessToken": "tok",
            "domain": "acme.bitrix24.com",
        }))
        .unwrap();

        assert_eq!(req.company_id, id);
        assert_eq!(req.credentials.access_token.as_deref(), Some("tok"));
        assert_eq!(req.credentials.domain.as_deref(), Some("acme.bitrix24.com"));
    }

    #[test]
    fn sync_request_without_credentials() {
        let req: SyncCompanyRequest =
            serde_json::from_value(json!({ "companyId": Uuid::new_v4() })).unwrap();
        assert!(req.credentials.access_token.is_none());
    }
}
