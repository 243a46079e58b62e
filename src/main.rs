//! Action Log server - approval workflows with time-bounded delegation

use action_log::config::ServerConfig;
use action_log::delegation::sweep;
use action_log::{app, db, AppState};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "action_log=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::parse();

    let pool = db::connect(&config.database_url).await?;
    let state = AppState::new(pool);

    match config.sweep_interval() {
        Some(interval) => {
            tracing::info!("Sweeping expired delegations every {:?}", interval);
            sweep::spawn_periodic(state.store.clone(), interval);
        }
        None => tracing::warn!("Periodic delegation sweep disabled"),
    }

    let app = app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
