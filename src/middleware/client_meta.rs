use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::headers::{HeaderMapExt, UserAgent};

use crate::AppState;
use crate::models::ClientMeta;

/// 客户端 IP
///
/// `trust_proxy` 为真时依次取 x-real-ip、x-forwarded-for 第一个非空值，
/// 否则只用连接地址。
pub fn client_ip(
    headers: &HeaderMap,
    remote: Option<SocketAddr>,
    trust_proxy: bool,
) -> Option<String> {
    if !trust_proxy {
        return remote.map(|addr| addr.ip().to_string());
    }
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
                .map(str::to_string)
        })
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
}

/// 请求来源信息提取器
pub struct Client(pub ClientMeta);

impl FromRequestParts<AppState> for Client {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);

        Ok(Client(ClientMeta {
            ip: client_ip(&parts.headers, remote, state.config.trust_proxy),
            device: parts
                .headers
                .typed_get::<UserAgent>()
                .map(|ua| ua.as_str().to_string()),
        }))
    }
}
