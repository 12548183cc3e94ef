use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::json;

use crate::models::Comment;
use crate::session::AdminSession;
use crate::store::StoreError;
use crate::validation::CommentPayload;
use crate::{ApiError, AppState};

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    tracing::info!("list_comments started");
    if state.store.get_post(&post_id).await?.is_none() {
        return Err(ApiError::NotFound("post"));
    }
    Ok(Json(state.store.list_comments(&post_id).await?))
}

/// Public: visitors leave comments without logging in.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<CommentPayload>, ApiError>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    tracing::info!("add_comment started");
    let draft = payload.validate()?;

    if state.store.get_post(&post_id).await?.is_none() {
        tracing::error!("add_comment not found post {}", post_id);
        return Err(ApiError::NotFound("post"));
    }

    match state.store.create_comment(&post_id, draft).await {
        Ok(comment) => {
            tracing::info!("add_comment inserted {} on post {}", comment.id, post_id);
            Ok((StatusCode::CREATED, Json(comment)))
        }
        Err(e) => Err(insert_failure(&post_id, e)),
    }
}

/// A post deleted between the existence check and the insert trips the
/// foreign key.
fn insert_failure(post_id: &str, e: StoreError) -> ApiError {
    if e.is_missing_parent() {
        tracing::error!("add_comment post {} vanished before insert", post_id);
        return ApiError::NotFound("post");
    }
    tracing::error!("add_comment failed to insert comment: {:?}", &e);
    e.into()
}

pub async fn delete_comment(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!("delete_comment started");
    if !state.store.delete_comment(&id).await? {
        return Err(ApiError::NotFound("comment"));
    }
    Ok(Json(json!({ "status": "ok", "id": id })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vanished_post_is_not_found() {
        let lost = StoreError::Mysql(mysql::Error::MySqlError(mysql::MySqlError {
            state: "23000".to_string(),
            message: "Cannot add or update a child row".to_string(),
            code: 1452,
        }));
        let err = insert_failure("p1", lost);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "post not found");

        let other = insert_failure("p1", StoreError::Decode("bad row".to_string()));
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
