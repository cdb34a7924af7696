use dotenvy::dotenv;
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use myf_website::config::AppConfig;
use myf_website::state::AppState;
use myf_website::web;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Configuration errors are fatal before anything binds.
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let host = config.host.clone();
    let port = config.port;
    info!(sheet = %config.attendee_sheet, event = %config.event_column, "config loaded");

    let state = match AppState::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            error!("mail setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let app = web::app(state);

    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(a) => a,
        Err(e) => {
            error!("cannot parse HOST/PORT {}:{}: {}", host, port, e);
            return ExitCode::FAILURE;
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            let fallback = SocketAddr::new(addr.ip(), port.saturating_add(1));
            warn!("⚠️  could not bind {}: {}. Trying fallback {}", addr, e, fallback);
            match tokio::net::TcpListener::bind(fallback).await {
                Ok(l) => l,
                Err(e) => {
                    error!("could not bind fallback {}: {}", fallback, e);
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    match listener.local_addr() {
        Ok(bound) => info!("🚀 server listening on http://{}", bound),
        Err(e) => warn!("listening, but local address is unknown: {}", e),
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("server stopped: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
