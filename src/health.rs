use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::AppState;

pub async fn health_check_handler(State(state): State<AppState>) -> Response {
    tracing::info!("health_check started");

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "message": "database connection is healthy"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("health_check failed: {:?}", &e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "fail",
                    "message": "database is unreachable"
                })),
            )
                .into_response()
        }
    }
}
