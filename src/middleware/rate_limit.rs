use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    error::AppError,
    limiter::Decision,
    middleware::auth::{Principal, resolve_principal},
};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// 按调用方等级扣减额度，超限返回 429，存储不可用返回 500
pub async fn rate_limit(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let principal = match req.extensions().get::<Principal>() {
        Some(principal) => principal.clone(),
        None => resolve_principal(
            &req,
            state.config.jwt_secret.as_deref(),
            state.config.trust_proxy_headers,
        ),
    };

    let decision = match state
        .limiter
        .try_consume(&principal.identifier, &principal.tier)
        .await
    {
        Ok(decision) => decision,
        Err(e) => return AppError::from(e).into_response(),
    };

    if !decision.allowed {
        tracing::info!(
            "Rate limited {} (tier {}, limit {})",
            principal.identifier,
            principal.tier,
            decision.limit
        );
        let mut response = AppError::RateLimited {
            tier: principal.tier,
            limit: decision.limit,
        }
        .into_response();
        set_headers(&mut response, &decision);
        return response;
    }

    req.extensions_mut().insert(decision);
    let mut response = next.run(req).await;
    set_headers(&mut response, &decision);
    response
}

fn set_headers(response: &mut Response, decision: &Decision) {
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
}
