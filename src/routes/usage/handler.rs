use axum::{
    extract::{Extension, State},
    response::Json,
};

use crate::{
    AppState,
    error::AppError,
    limiter::{Decision, UsageSnapshot},
    middleware::Principal,
    result::ApiResult,
};

use super::model::{ThrottleResponse, WelcomeResponse};

pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        message: "Welcome to the tiered quota API".to_string(),
    })
}

/// 查询当前调用方的用量，不计数
#[axum::debug_handler]
pub async fn usage_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ApiResult<UsageSnapshot>>, AppError> {
    let snapshot = state
        .limiter
        .peek(&principal.identifier, &principal.tier)
        .await?;
    let remaining = snapshot.remaining;
    Ok(Json(ApiResult::success(snapshot).with_remaining(remaining)))
}

/// 供上游代理调用的放行接口，扣减已在限流中间件中完成
pub async fn throttle(Extension(decision): Extension<Decision>) -> Json<ApiResult<ThrottleResponse>> {
    Json(
        ApiResult::success(ThrottleResponse {
            allowed: decision.allowed,
            limit: decision.limit,
            remaining: decision.remaining,
        })
        .with_remaining(decision.remaining),
    )
}
