use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use config::Config;
use limiter::RateLimiter;

pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod limiter;
pub mod middleware;
pub mod result;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub limiter: Arc<RateLimiter>,
}

/// 组装路由：所有请求先解析身份，受限路由再经过限流
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(routes::usage::welcome))
        .route("/api/usage", get(routes::usage::usage_status));

    let limited_routes = Router::new()
        .route("/api/throttle", post(routes::usage::throttle))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ));

    Router::new()
        .merge(public_routes)
        .merge(limited_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::identify,
        ))
        .with_state(state)
}
