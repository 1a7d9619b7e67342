use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    /// CNPJ or CPF, digits only.
    pub document: String,
    pub bitrix_company_id: Option<i64>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
    pub document: String,
}

impl CreateCompanyRequest {
    /// Trims the name and strips punctuation from the document.
    pub fn validate(self) -> Result<Self, AppError> {
        let name = self.name.trim().to_string();
        if name.len() < 2 || name.len() > 160 {
            return Err(AppError::Validation(
                "company name must be between 2 and 160 characters".into(),
            ));
        }

        let document = normalize_document(&self.document).ok_or_else(|| {
            AppError::Validation("document must be a CPF (11 digits) or CNPJ (14 digits)".into())
        })?;

        Ok(Self { name, document })
    }
}

pub fn normalize_document(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | '/' | ' '))
        .collect();
    let valid = digits.chars().all(|c| c.is_ascii_digit()) && matches!(digits.len(), 11 | 14);
    valid.then_some(digits)
}

impl Company {
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, document, bitrix_company_id, created_by, created_at
            FROM companies
            ORDER BY name
            "#,
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, document, bitrix_company_id, created_by, created_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        req: CreateCompanyRequest,
        created_by: &str,
    ) -> Result<Self, sqlx::Error> {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (id, name, document, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, document, bitrix_company_id, created_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.document)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        tracing::info!(company_id = %company.id, created_by, "Company registered");
        Ok(company)
    }

    pub async fn set_bitrix_id(
        pool: &PgPool,
        id: Uuid,
        bitrix_company_id: i64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET bitrix_company_id = $1
            WHERE id = $2
            RETURNING id, name, document, bitrix_company_id, created_by, created_at
            "#,
        )
        .bind(bitrix_company_id)
        .bind(id)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_are_normalized() {
        assert_eq!(
            normalize_document("12.345.678/0001-90").as_deref(),
            Some("12345678000190")
        );
        assert_eq!(normalize_document("123.456.789-09").as_deref(), Some("12345678909"));
        assert_eq!(normalize_document("1234"), None);
        assert_eq!(normalize_document("12a.456.789-09"), None);
    }

    #[test]
    fn short_names_are_rejected() {
        let req = CreateCompanyRequest {
            name: " A ".into(),
            document: "12345678909".into(),
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }
}
