use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use battleboard_application::AppState;
use battleboard_infrastructure::{
    run_battle_worker, run_jobs_once, schedule_cleanup, schedule_discovery, schedule_enqueue,
    schedule_kill_poll, AppConfig,
};
use battleboard_interfaces_http::build_router;

use crate::context::AppContext;

fn build_router_with_layers(state: AppState) -> Router {
    build_router(state.clone())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(
            state.config.request_timeout_seconds,
        )))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_standalone(config: AppConfig) -> Result<()> {
    let context = AppContext::new(&config)?;
    let state = context.state;

    let token = CancellationToken::new();
    let (sender, receiver) = mpsc::channel(state.config.work_queue_capacity.max(1));
    let tasks = vec![
        tokio::spawn(schedule_cleanup(state.clone(), token.clone())),
        tokio::spawn(schedule_kill_poll(state.clone(), token.clone())),
        tokio::spawn(schedule_discovery(state.clone(), token.clone())),
        tokio::spawn(schedule_enqueue(state.clone(), sender, token.clone())),
        tokio::spawn(run_battle_worker(state.clone(), receiver, token.clone())),
    ];

    if state.config.http_enabled {
        let app = build_router_with_layers(state.clone());
        let addr: std::net::SocketAddr = state.config.bind_addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!("listening on {}", addr);

        let server_token = token.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                server_token.cancel();
            })
            .await?;
    } else {
        info!("http surface disabled");
        shutdown_signal().await;
    }

    token.cancel();
    for task in tasks {
        if let Err(err) = task.await {
            warn!("background task ended abnormally: {}", err);
        }
    }
    info!("shutdown complete");
    Ok(())
}

pub async fn run_once(config: AppConfig) -> Result<()> {
    let context = AppContext::new(&config)?;
    run_jobs_once(&context.state).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("sigterm handler unavailable: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}
