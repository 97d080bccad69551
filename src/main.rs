use std::process::ExitCode;
use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use sports_events_server::config::Config;
use sports_events_server::db::{MemoryRepository, PgRepository, SharedRepository};
use sports_events_server::routes::create_routes;
use sports_events_server::state::AppState;

async fn open_repository(config: &Config) -> Result<SharedRepository, Box<dyn std::error::Error>> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using the in-memory repository; data will not persist");
        return Ok(Arc::new(MemoryRepository::new()));
    };

    let repo = PgRepository::connect(database_url, config.max_connections).await?;
    tracing::info!("Successfully connected to database");

    repo.migrate().await?;
    tracing::info!("Migrations run successfully");

    Ok(Arc::new(repo))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let repo = match open_repository(&config).await {
        Ok(repo) => repo,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open repository");
            return ExitCode::FAILURE;
        }
    };

    let addr = config.bind_addr;
    let app = create_routes(AppState::new(repo, config));

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "Failed to bind address");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("🚀 Server running at http://{}", addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "Server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
