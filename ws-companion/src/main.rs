use anyhow::Result;
use tracing::info;
use ws_companion::{create_app, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ws_companion=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting workspace companion...");

    let config = Config::from_env();
    info!(
        "Configuration loaded: bind_addr={}, files_root={}",
        config.bind_addr,
        config.files_root.display()
    );

    let state = AppState::new(&config)?;
    let app = create_app(state.clone());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Workspace processes must not outlive the companion.
    state.processes.purge_all().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not install shutdown handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
