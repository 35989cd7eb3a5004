use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;

use crate::{
    AppState,
    cache::keys::{ip_identifier, user_identifier},
    utils::verify_token,
};

pub const GUEST_TIER: &str = "guest";

/// 限流主体：标识符加等级
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub identifier: String,
    pub tier: String,
}

impl Principal {
    pub fn guest(addr: &str) -> Self {
        Self {
            identifier: ip_identifier(addr),
            tier: GUEST_TIER.to_string(),
        }
    }

    pub fn user(user_id: &str, tier: &str) -> Self {
        Self {
            identifier: user_identifier(user_id),
            tier: tier.to_string(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.tier == GUEST_TIER
    }
}

/// 解析调用方身份并放入请求扩展，令牌缺失或无效时按访客处理
pub async fn identify(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let principal = resolve_principal(
        &req,
        state.config.jwt_secret.as_deref(),
        state.config.trust_proxy_headers,
    );
    tracing::debug!("principal: {:?}", principal);
    req.extensions_mut().insert(principal);
    next.run(req).await
}

pub fn resolve_principal<B>(
    req: &Request<B>,
    jwt_secret: Option<&str>,
    trust_proxy_headers: bool,
) -> Principal {
    if let (Some(secret), Some(token)) = (jwt_secret, bearer_token(req.headers())) {
        match verify_token(token, secret) {
            Ok(claims) => return Principal::user(&claims.sub, &claims.tier),
            Err(e) => tracing::warn!("JWT verification failed, continuing as guest: {}", e),
        }
    }
    Principal::guest(&client_ip(req, trust_proxy_headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 默认只认连接地址；`trust_proxy_headers` 开启时依次取 x-real-ip、x-forwarded-for 第一个地址
pub fn client_ip<B>(req: &Request<B>, trust_proxy_headers: bool) -> String {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());

    let forwarded = if trust_proxy_headers {
        forwarded_ip(req.headers())
    } else {
        None
    };

    forwarded
        .or(remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

fn forwarded_ip(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
}
