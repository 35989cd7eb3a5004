use std::time::Duration;

use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::result::ApiResult;

/// 限流核心的错误
///
/// 超出限额不是错误，而是 `allowed = false` 的正常判定结果。
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("usage store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
    #[error("usage store did not answer within {0:?}")]
    StoreTimeout(Duration),
}

impl RateLimitError {
    /// 超时同样按存储不可用处理
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::StoreTimeout(_))
    }
}

#[derive(Debug)]
pub enum AppError {
    RateLimited { tier: String, limit: u32 },
    InternalServerError,
}

impl AppError {
    /// 拒绝时提示所属等级和每小时上限
    pub fn denial_message(tier: &str, limit: u32) -> String {
        if tier == "guest" {
            format!(
                "Too many requests. Guest users can make {} requests per hour. Please sign up or log in to continue.",
                limit
            )
        } else {
            format!(
                "Too many requests. {} users can make {} requests per hour.",
                capitalize(tier),
                limit
            )
        }
    }
}

/// 5xx 只在这里记录一次，带上底层原因
impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        tracing::error!("Rate limit error: {}", err);
        AppError::InternalServerError
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::RateLimited { tier, limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                AppError::denial_message(&tier, limit),
            ),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ApiResult::<()>::error(&error_message).with_remaining(0));

        (status, body).into_response()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
