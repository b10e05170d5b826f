use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use auth_service::config::load_service_config;
use auth_service::directory::{InMemoryDirectory, PrincipalDirectory};
use auth_service::metrics::AuthMetrics;
use auth_service::{build_router, AppState};
use common_auth::build_token_service;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_service_config()?;
    let tokens = build_token_service(&config.token).context("Failed to build token service")?;

    let directory = match &config.directory_path {
        Some(path) => {
            let directory = InMemoryDirectory::load(path)
                .with_context(|| format!("Failed to load principals from {}", path.display()))?;
            info!(principals = directory.len(), path = %path.display(), "principal directory loaded");
            directory
        }
        None => {
            warn!("AUTH_DIRECTORY_PATH not set; every login will be rejected");
            InMemoryDirectory::default()
        }
    };
    let directory: Arc<dyn PrincipalDirectory> = Arc::new(directory);

    let metrics = Arc::new(AuthMetrics::new()?);
    let state = AppState::new(
        tokens,
        config.route_policy.clone(),
        directory,
        config.cookie.clone(),
        metrics,
    );
    let app = build_router(state);

    let ip: std::net::IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST '{}'", config.host))?;
    let addr = SocketAddr::from((ip, config.port));

    info!(%addr, engine = %config.token.engine, lifetime_seconds = config.token.lifetime.get(), "starting auth-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
