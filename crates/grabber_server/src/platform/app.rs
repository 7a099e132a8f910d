use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use grabber_engine::{ensure_output_dir, EngineHandle};
use grabber_logging::{grabber_info, grabber_warn};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::ServerConfig;
use super::effects::QueueRunner;
use super::http::{build_router, AppState};
use super::logging::{self, LogDestination};

/// Loads configuration, starts the queue runner and serves until Ctrl-C.
pub async fn run() -> Result<()> {
    let config = ServerConfig::load().context("loading configuration")?;
    logging::initialize(config.level_filter(), LogDestination::from_config(&config));

    ensure_output_dir(&config.download_dir)
        .with_context(|| format!("preparing {}", config.download_dir.display()))?;

    let shutdown = CancellationToken::new();
    let (state, runner) = build_state(config, shutdown.clone());
    let addr = state.config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind failed: {addr}"))?;

    grabber_info!("Server running on {addr}");
    grabber_info!(
        "Allowed origins: {}",
        state.config.allowed_origins.join(", ")
    );

    let signal_token = shutdown.clone();
    serve(listener, state, async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            grabber_warn!("could not listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
        grabber_info!("Stopping server");
        signal_token.cancel();
    })
    .await?;

    shutdown.cancel();
    runner.await.context("queue runner task failed")?;
    Ok(())
}

/// Wires engine, progress channel and queue runner into the router state.
pub fn build_state(config: ServerConfig, shutdown: CancellationToken) -> (AppState, JoinHandle<()>) {
    let engine = EngineHandle::new(config.engine_config());
    let (queue, runner) = QueueRunner::spawn(engine.clone(), config.queue_delay(), shutdown);
    let state = AppState {
        engine,
        queue,
        config: Arc::new(config),
    };
    (state, runner)
}

pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")
}
