use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tokio::time::{timeout, Duration};
use tracing::error;

use battleboard_application::queries::queue_queries;
use battleboard_application::AppState;
use battleboard_domain::{BattleQueueItem, QueueQuery};

use crate::error::HttpError;
use crate::middleware::authorize;

#[derive(Serialize)]
struct NotifyStatus {
    status: &'static str,
}

pub async fn health_live() -> StatusCode {
    StatusCode::OK
}

pub async fn health_ready(State(state): State<AppState>) -> StatusCode {
    let timeout_secs = state.config.request_timeout_seconds.max(1);
    let timeout_duration = Duration::from_secs(timeout_secs);
    match timeout(timeout_duration, state.health.check_database()).await {
        Ok(Ok(true)) => StatusCode::OK,
        Ok(Ok(false)) => StatusCode::SERVICE_UNAVAILABLE,
        Ok(Err(err)) => {
            error!("ready check failed: {}", err);
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(_) => {
            error!("ready check timeout after {}s", timeout_secs);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn notify_target_check(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorize(&state.config, &headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(NotifyStatus {
                status: "unauthorized",
            }),
        );
    }

    let timeout_secs = state.config.request_timeout_seconds.max(1);
    match timeout(
        Duration::from_secs(timeout_secs),
        state.health.check_notification_target(),
    )
    .await
    {
        Ok(Ok(true)) => (StatusCode::OK, Json(NotifyStatus { status: "ok" })),
        Ok(Ok(false)) => (StatusCode::OK, Json(NotifyStatus { status: "unset" })),
        Ok(Err(err)) => {
            error!("notification target check failed: {}", err);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(NotifyStatus { status: "error" }),
            )
        }
        Err(_) => {
            error!("notification target check timeout after {}s", timeout_secs);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(NotifyStatus { status: "timeout" }),
            )
        }
    }
}

pub async fn metrics_prometheus(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if !authorize(&state.config, &headers) {
        return (StatusCode::UNAUTHORIZED, "unauthorized".to_string()).into_response();
    }
    let payload = state.metrics.render_prometheus();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    (headers, payload).into_response()
}

pub async fn list_queue(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<QueueQuery>,
) -> Result<Json<Vec<BattleQueueItem>>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }
    let items = queue_queries::list_queue(&state, query).await?;
    Ok(Json(items))
}
