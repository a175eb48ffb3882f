use clap::Parser;
use std::time::Duration;

use crate::gemini::GEMINI_API_BASE;
use crate::quota::QuotaPolicy;
use crate::relay::ModelPolicy;

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "journal-gateway")]
#[command(about = "Quota-guarded relay from journal entries to Gemini")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    // Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    // Gemini API root
    #[arg(long, env = "GEMINI_API_BASE", default_value = GEMINI_API_BASE)]
    pub gemini_api_base: String,

    // Model tried first
    #[arg(long, env = "PRIMARY_MODEL", default_value = "gemini-1.5-flash-latest")]
    pub primary_model: String,

    // Model tried once when the primary fails
    #[arg(long, env = "FALLBACK_MODEL", default_value = "gemini-1.5-flash")]
    pub fallback_model: String,

    // Upstream request timeout in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 60)]
    pub upstream_timeout: u64,

    // Max requests per client per window
    #[arg(long, env = "QUOTA_LIMIT", default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    pub quota_limit: u32,

    // Quota window in seconds (6 hours)
    #[arg(long, env = "QUOTA_WINDOW_SECS", default_value_t = 21_600, value_parser = clap::value_parser!(u64).range(1..))]
    pub quota_window: u64,

    // Max clients tracked by the quota store
    #[arg(long, env = "QUOTA_CAPACITY", default_value_t = 100_000)]
    pub quota_capacity: usize,

    // How often expired quota records are swept, in seconds
    #[arg(long, env = "QUOTA_SWEEP_SECS", default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..))]
    pub quota_sweep: u64,

    // Number of reverse proxies in front of the server. 0 ignores X-Forwarded-For,
    // n takes the n-th entry from the right. Entries further left come from the caller.
    #[arg(long, env = "TRUSTED_PROXIES", default_value_t = 0)]
    pub trusted_proxies: usize,

    // Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn quota_policy(&self) -> QuotaPolicy {
        QuotaPolicy {
            limit: self.quota_limit,
            window: Duration::from_secs(self.quota_window),
            capacity: self.quota_capacity,
        }
    }

    pub fn model_policy(&self) -> ModelPolicy {
        ModelPolicy {
            primary: self.primary_model.clone(),
            fallback: self.fallback_model.clone(),
        }
    }
}
