use std::sync::Arc;
use crate::quota::QuotaGuard;
use crate::relay::Relay;
// app's shared state

pub struct AppState {
    pub quota: Arc<QuotaGuard>,
    pub relay: Relay,
    pub trusted_proxies: usize, // proxy hops allowed to set X-Forwarded-For
}
