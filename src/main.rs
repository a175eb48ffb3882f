use anyhow::Context;
use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use journal_gateway::{
    build_router,
    config::Args,
    gemini::GeminiClient,
    quota::{self, QuotaGuard},
    relay::Relay,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so clap sees it
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let gemini = GeminiClient::new(
        args.gemini_api_key.clone(),
        Duration::from_secs(args.upstream_timeout),
    )
    .context("failed to build Gemini client")?
    .with_base_url(args.gemini_api_base.clone());

    let quota_guard = Arc::new(QuotaGuard::new(args.quota_policy()));

    let state = Arc::new(AppState {
        quota: Arc::clone(&quota_guard),
        relay: Relay::new(Arc::new(gemini), args.model_policy()),
        trusted_proxies: args.trusted_proxies,
    });

    // spawn the background sweeper
    tokio::spawn(quota::sweeper(quota_guard, Duration::from_secs(args.quota_sweep)));

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("Server running on http://localhost:{}", args.port);
    tracing::info!(
        primary = %args.primary_model,
        fallback = %args.fallback_model,
        "Forwarding journal entries to Gemini"
    );
    tracing::info!(
        "Quota: {} requests per {} seconds per client",
        args.quota_limit, args.quota_window
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
