use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Property {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub address: String,
    pub price_cents: i64,
    pub bitrix_deal_id: Option<i64>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePropertyRequest {
    pub company_id: Uuid,
    pub title: String,
    pub address: String,
    pub price_cents: i64,
}

impl CreatePropertyRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        let title = self.title.trim().to_string();
        let address = self.address.trim().to_string();

        if title.is_empty() || title.len() > 200 {
            return Err(AppError::Validation(
                "title must be between 1 and 200 characters".into(),
            ));
        }
        if address.is_empty() {
            return Err(AppError::Validation("address is required".into()));
        }
        if self.price_cents < 0 {
            return Err(AppError::Validation("price cannot be negative".into()));
        }

        Ok(Self {
            title,
            address,
            ..self
        })
    }
}

impl Property {
    pub async fn list_by_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Property>(
            r#"
            SELECT id, company_id, title, address, price_cents, bitrix_deal_id, created_by, created_at
            FROM properties
            WHERE company_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        req: CreatePropertyRequest,
        created_by: &str,
    ) -> Result<Self, sqlx::Error> {
        let property = sqlx::query_as::<_, Property>(
            r#"
            INSERT INTO properties (id, company_id, title, address, price_cents, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, company_id, title, address, price_cents, bitrix_deal_id, created_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(req.company_id)
        .bind(req.title)
        .bind(req.address)
        .bind(req.price_cents)
        .bind(created_by)
        .fetch_one(pool)
        .await?;

        tracing::info!(property_id = %property.id, company_id = %property.company_id, "Property registered");
        Ok(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(title: &str, price_cents: i64) -> CreatePropertyRequest {
        CreatePropertyRequest {
            company_id: Uuid::new_v4(),
            title: title.into(),
            address: " Rua das Flores, 10 ".into(),
            price_cents,
        }
    }

    #[test]
    fn validation_trims_fields() {
        let req = request("  Apartamento 2 quartos ", 45_000_000).validate().unwrap();
        assert_eq!(req.title, "Apartamento 2 quartos");
        assert_eq!(req.address, "Rua das Flores, 10");
    }

    #[test]
    fn negative_price_is_rejected() {
        assert!(matches!(
            request("Casa", -1).validate(),
            Err(AppError::Validation(_))
        ));
    }
}
