//! QKA DeFi client — entry point.
//!
//! Serves the swap, Ve, farm, vote and faucet screens as JSON over HTTP and
//! drives their on-chain actions through the Aptos REST API and an external
//! wallet bridge. A background task refreshes the vote board whenever the
//! connected account changes.

mod api;
mod chain;
mod config;
mod errors;
mod faucet;
mod lifecycle;
mod notify;
mod rows;
mod rpc;
mod session;
#[cfg(test)]
mod testing;
mod units;
mod ve;
mod vote;

use std::sync::Arc;

use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::AppState;
use config::Config;
use rpc::RestClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;
    info!(network = ?config.network, node = %config.node_url, "Using Aptos node");

    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    let chain = Arc::new(RestClient::new(
        client,
        &config.node_url,
        &config.wallet_url,
        config.confirm_timeout,
        config.confirm_poll,
    ));

    let state = Arc::new(AppState::new(config.clone(), chain));

    // ─── Vote board refresher ─────────────────────────────
    tokio::spawn(session::watch_account(
        state.vote.board().clone(),
        state.session.subscribe(),
    ));

    // ─── HTTP API ─────────────────────────────────────────
    let app = api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
