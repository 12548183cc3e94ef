use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::json;

use crate::content::{bilingual, cloudinary};
use crate::models::{Archive, ArchiveCategory};
use crate::session::AdminSession;
use crate::validation::ArchivePayload;
use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ArchiveQuery {
    pub lang: Option<bilingual::Lang>,
    pub category: Option<ArchiveCategory>,
    pub tag: Option<String>,
}

impl ArchiveQuery {
    fn matches(&self, archive: &Archive) -> bool {
        let category_ok = self.category.map_or(true, |c| c == archive.category);
        let tag_ok = self.tag.as_deref().map_or(true, |tag| {
            archive.tags.iter().any(|t| t.eq_ignore_ascii_case(tag.trim()))
        });
        category_ok && tag_ok
    }

    fn localize(&self, content: String) -> String {
        bilingual::LangQuery { lang: self.lang }.localize(content)
    }
}

/// Optional `?category=` and `?tag=` filters; drafts only for the admin.
pub async fn list_archives(
    State(state): State<AppState>,
    admin: Option<AdminSession>,
    Query(query): Query<ArchiveQuery>,
) -> Result<Json<Vec<Archive>>, ApiError> {
    tracing::info!("list_archives started");
    let archives = state
        .store
        .list_archives(admin.is_some())
        .await?
        .into_iter()
        .filter(|a| query.matches(a))
        .map(|mut archive| {
            archive.content = query.localize(archive.content);
            archive
        })
        .collect();
    Ok(Json(archives))
}

pub async fn get_archive(
    State(state): State<AppState>,
    admin: Option<AdminSession>,
    Path(id): Path<String>,
    Query(query): Query<ArchiveQuery>,
) -> Result<Json<Archive>, ApiError> {
    tracing::info!("get_archive started");
    let mut archive = state
        .store
        .get_archive(&id)
        .await?
        .filter(|a| a.published || admin.is_some())
        .ok_or(ApiError::NotFound("archive"))?;
    archive.content = cloudinary::optimize_html(&query.localize(archive.content), None);
    Ok(Json(archive))
}

pub async fn add_archive(
    State(state): State<AppState>,
    _admin: AdminSession,
    WithRejection(Json(payload), _): WithRejection<Json<ArchivePayload>, ApiError>,
) -> Result<(StatusCode, Json<Archive>), ApiError> {
    tracing::info!("add_archive started");
    let draft = payload.validate()?;

    match state.store.create_archive(draft).await {
        Ok(archive) => {
            tracing::info!("add_archive succeeded in inserting new archive {}", archive.id);
            Ok((StatusCode::CREATED, Json(archive)))
        }
        Err(e) => {
            tracing::error!("add_archive failed to insert new archive: {:?}", &e);
            Err(e.into())
        }
    }
}

pub async fn update_archive(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<ArchivePayload>, ApiError>,
) -> Result<Json<Archive>, ApiError> {
    tracing::info!("update_archive started");
    let draft = payload.validate()?;

    let archive = state
        .store
        .update_archive(&id, draft)
        .await?
        .ok_or(ApiError::NotFound("archive"))?;
    Ok(Json(archive))
}

pub async fn delete_archive(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!("delete_archive started");
    if !state.store.delete_archive(&id).await? {
        return Err(ApiError::NotFound("archive"));
    }
    Ok(Json(json!({ "status": "ok", "id": id })))
}
