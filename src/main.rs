mod config;
mod engine;
mod errors;
mod models;
mod scenarios;
mod server;
mod session;
mod simulation;
mod state;

use crate::state::{AppState, EngineEvent};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("bs_live engine starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        tick_ms = cfg.sim_tick.as_millis() as u64,
        lower = cfg.sim_range.lower,
        upper = cfg.sim_range.upper,
        step = cfg.sim_range.step,
        "simulation configured"
    );

    // Bounded command channel into the engine
    let (engine_tx, engine_rx) = mpsc::channel::<EngineEvent>(512);
    let app_state = AppState::new(cfg.clone(), engine_tx.clone());

    // Engine task (single owner of the pricing session)
    let engine_state = app_state.clone();
    let engine = tokio::spawn(async move {
        engine::run_engine(engine_state, engine_rx).await;
    });

    // Axum HTTP + WS server
    let app = server::router(app_state);
    let addr = format!("0.0.0.0:{}", cfg.server_port);
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("signal handler error: {e}");
        }
        tracing::info!("ctrl-c received, shutting down");
    };

    if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
        tracing::error!("server error: {e}");
    }

    let _ = engine_tx.send(EngineEvent::Shutdown).await;
    let _ = engine.await;
}
