use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use venue_picker_api::{
    api::{create_router, AppState},
    config::Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("venue_picker_api=debug,tower_http=debug")),
        )
        .with(fmt::layer())
        .init();

    let config = Config::from_env()?;
    let state = Arc::new(AppState::new(&config)?);

    // Search readiness is reported on /health; nearby requests retry the warm-up
    state.spawn_search_warm_up();
    state.spawn_session_sweeper(config.session_idle(), config.session_sweep_interval());

    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("Server running on http://{}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await?;
    Ok(())
}

async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    let cleared = state.teardown_all().await;
    tracing::info!(sessions = cleared, "Shutting down");
}
