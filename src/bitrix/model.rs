use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub member_id: Option<String>,
}

/// `user.current`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct BitrixUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl BitrixUser {
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            format!("User {}", self.id)
        } else {
            parts.join(" ")
        }
    }
}

/// A row of `crm.company.list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CrmCompany {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company_type: Option<String>,
    #[serde(default)]
    pub date_create: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_available_parts() {
        let user: BitrixUser =
            serde_json::from_str(r#"{"ID": "12", "NAME": "Ana", "LAST_NAME": "Souza"}"#).unwrap();
        assert_eq!(user.display_name(), "Ana Souza");

        let user: BitrixUser = serde_json::from_str(r#"{"ID": "12", "NAME": " "}"#).unwrap();
        assert_eq!(user.display_name(), "User 12");
    }

    #[test]
    fn crm_company_reads_upper_case_fields() {
        let company: CrmCompany = serde_json::from_str(
            r#"{"ID": "3", "TITLE": "Imobiliária Sol", "COMPANY_TYPE": "CUSTOMER"}"#,
        )
        .unwrap();
        assert_eq!(company.id, "3");
        assert_eq!(company.company_type.as_deref(), Some("CUSTOMER"));
    }
}
