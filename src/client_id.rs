use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::state::AppState;

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

// Quota subject of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientId(pub String);

impl FromRequestParts<Arc<AppState>> for ClientId {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(ClientId(resolve_client_id(
            &parts.headers,
            peer,
            state.trusted_proxies,
        )))
    }
}

// With n trusted proxies in front, the client is the n-th X-Forwarded-For entry from the
// right: everything left of it was written by the caller and can be forged. Falls back to
// the leftmost entry when the chain is shorter, and to the peer IP when nothing is trusted.
pub fn resolve_client_id(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted_proxies: usize,
) -> String {
    if trusted_proxies > 0 {
        let chain: Vec<&str> = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        if !chain.is_empty() {
            return chain[chain.len().saturating_sub(trusted_proxies)].to_string();
        }
    }

    match peer {
        Some(addr) => addr.ip().to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}
