use std::net::SocketAddr;

use tokio::signal;

use gungnir::{api_router, config::Settings, middleware, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::new()?;
    middleware::init_tracing(&settings.log_level, &settings.log_format)?;

    tracing::info!("starting gungnir v{}", env!("CARGO_PKG_VERSION"));

    let cors = middleware::cors_layer(&settings.cors_allow_origins);

    // Engine probes run inside AppState construction.
    let state = AppState::new(settings).await;

    let app = api_router(state)
        .layer(axum::middleware::from_fn(
            middleware::correlation_middleware,
        ))
        .layer(middleware::trace_layer())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8000));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
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
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
