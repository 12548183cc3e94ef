use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::json;

use crate::content::{cloudinary, LangQuery};
use crate::models::Post;
use crate::session::AdminSession;
use crate::validation::PostPayload;
use crate::{ApiError, AppState};

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    tracing::info!("list_posts started");
    let posts = state
        .store
        .list_posts()
        .await?
        .into_iter()
        .map(|mut post| {
            post.content = query.localize(post.content);
            post
        })
        .collect();
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LangQuery>,
) -> Result<Json<Post>, ApiError> {
    tracing::info!("get_post started");
    let mut post = state.store.get_post(&id).await?.ok_or(ApiError::NotFound("post"))?;
    post.content = cloudinary::optimize_html(&query.localize(post.content), None);
    Ok(Json(post))
}

pub async fn add_post(
    State(state): State<AppState>,
    _admin: AdminSession,
    WithRejection(Json(payload), _): WithRejection<Json<PostPayload>, ApiError>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    tracing::info!("add_post started");
    let draft = payload.validate()?;

    match state.store.create_post(draft).await {
        Ok(post) => {
            tracing::info!("add_post succeeded in inserting new post {}", post.id);
            Ok((StatusCode::CREATED, Json(post)))
        }
        Err(e) => {
            tracing::error!("add_post failed to insert new post: {:?}", &e);
            Err(e.into())
        }
    }
}

pub async fn update_post(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<PostPayload>, ApiError>,
) -> Result<Json<Post>, ApiError> {
    tracing::info!("update_post started");
    let draft = payload.validate()?;

    let post = state
        .store
        .update_post(&id, draft)
        .await?
        .ok_or(ApiError::NotFound("post"))?;
    tracing::info!("update_post updated {}", post.id);
    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!("delete_post started");
    if !state.store.delete_post(&id).await? {
        return Err(ApiError::NotFound("post"));
    }
    tracing::info!("delete_post removed {}", id);
    Ok(Json(json!({ "status": "ok", "id": id })))
}
