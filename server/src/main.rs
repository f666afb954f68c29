//! Remote Workspace Reconciliation Server
//!
//! Control plane for remote development workspaces. Cluster agents poll the
//! reconcile endpoint with the state of the workspaces they run; the server
//! answers with the workspaces each agent must act on.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod error;
mod infra;
mod service;

pub use config::Config;
pub use error::{Error, Result};

use infra::agent_repository::AgentRepository;
use infra::workspace_repository::WorkspaceRepository;
use service::agent::AgentService;
use service::reconcile::ReconcileService;
use service::workspace::WorkspaceService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub agent_service: Arc<AgentService>,
    pub workspace_service: Arc<WorkspaceService>,
    pub reconcile_service: Arc<ReconcileService>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    let config = Arc::new(config);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let http_addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;

    info!("Starting Reconcile Server");
    info!("HTTP listening on {}", http_addr);

    // Initialize infrastructure
    let pool = infra::sqlite::init_pool(&config.database_url).await?;
    let workspace_repository = Arc::new(WorkspaceRepository::new(pool.clone()));
    let agent_repository = Arc::new(AgentRepository::new(
        pool,
        config.default_agent_lifecycle_config(),
    ));

    // Initialize services
    let agent_service = Arc::new(AgentService::new(agent_repository.clone()));
    let workspace_service = Arc::new(WorkspaceService::new(
        workspace_repository.clone(),
        agent_repository.clone(),
    ));
    let reconcile_service = Arc::new(ReconcileService::new(
        workspace_repository,
        agent_repository,
        config,
    ));

    // Create application state
    let state = AppState {
        agent_service,
        workspace_service,
        reconcile_service,
    };

    let app = api::http::create_router(state);

    axum::serve(
        tokio::net::TcpListener::bind(http_addr).await?,
        app.into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
