use axum::Json;
use serde::{Deserialize, Serialize};

/// Success envelope. Failures use the `AppError` body instead.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResult<T: Serialize> {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<T>,
}

impl<T: Serialize> ApiResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            content: Some(data),
        }
    }
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResult<T>> {
    Json(ApiResult::success(data))
}
