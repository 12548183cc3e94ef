use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::json;

use crate::content::{cloudinary, LangQuery};
use crate::models::Work;
use crate::session::AdminSession;
use crate::validation::WorkPayload;
use crate::{ApiError, AppState};

/// Drafts are listed only for the admin.
pub async fn list_works(
    State(state): State<AppState>,
    admin: Option<AdminSession>,
    Query(query): Query<LangQuery>,
) -> Result<Json<Vec<Work>>, ApiError> {
    tracing::info!("list_works started");
    let works = state
        .store
        .list_works(admin.is_some())
        .await?
        .into_iter()
        .map(|mut work| {
            work.content = query.localize(work.content);
            work
        })
        .collect();
    Ok(Json(works))
}

pub async fn get_work(
    State(state): State<AppState>,
    admin: Option<AdminSession>,
    Path(id): Path<String>,
    Query(query): Query<LangQuery>,
) -> Result<Json<Work>, ApiError> {
    tracing::info!("get_work started");
    let mut work = state
        .store
        .get_work(&id)
        .await?
        .filter(|w| w.published || admin.is_some())
        .ok_or(ApiError::NotFound("work"))?;
    work.content = cloudinary::optimize_html(&query.localize(work.content), None);
    Ok(Json(work))
}

pub async fn add_work(
    State(state): State<AppState>,
    _admin: AdminSession,
    WithRejection(Json(payload), _): WithRejection<Json<WorkPayload>, ApiError>,
) -> Result<(StatusCode, Json<Work>), ApiError> {
    tracing::info!("add_work started");
    let draft = payload.validate()?;

    match state.store.create_work(draft).await {
        Ok(work) => {
            tracing::info!("add_work succeeded in inserting new work {}", work.id);
            Ok((StatusCode::CREATED, Json(work)))
        }
        Err(e) => {
            tracing::error!("add_work failed to insert new work: {:?}", &e);
            Err(e.into())
        }
    }
}

pub async fn update_work(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<WorkPayload>, ApiError>,
) -> Result<Json<Work>, ApiError> {
    tracing::info!("update_work started");
    let draft = payload.validate()?;

    let work = state
        .store
        .update_work(&id, draft)
        .await?
        .ok_or(ApiError::NotFound("work"))?;
    Ok(Json(work))
}

pub async fn delete_work(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!("delete_work started");
    if !state.store.delete_work(&id).await? {
        return Err(ApiError::NotFound("work"));
    }
    Ok(Json(json!({ "status": "ok", "id": id })))
}
