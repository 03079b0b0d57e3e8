use axum::Router;

use battleboard_application::AppState;

use crate::handlers::{ops_handlers, query_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/battles",
            axum::routing::get(query_handlers::list_battles),
        )
        .route(
            "/v1/battles/:battle_id",
            axum::routing::get(query_handlers::get_battle),
        )
        .route("/v1/kills", axum::routing::get(query_handlers::list_kills))
        .route("/v1/ops/queue", axum::routing::get(ops_handlers::list_queue))
        .route(
            "/v1/ops/notify-target/check",
            axum::routing::get(ops_handlers::notify_target_check),
        )
        .route(
            "/v1/ops/health/live",
            axum::routing::get(ops_handlers::health_live),
        )
        .route(
            "/v1/ops/health/ready",
            axum::routing::get(ops_handlers::health_ready),
        )
        .route(
            "/v1/ops/metrics/prometheus",
            axum::routing::get(ops_handlers::metrics_prometheus),
        )
        .with_state(state)
}
