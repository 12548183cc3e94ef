use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde_json::Value;

use crate::content::LangQuery;
use crate::models::{PageContent, PageName};
use crate::session::AdminSession;
use crate::validation::PagePayload;
use crate::{ApiError, AppState};

fn parse_page(raw: &str) -> Result<PageName, ApiError> {
    PageName::from_str(raw).map_err(|_| ApiError::NotFound("page"))
}

pub async fn list_pages(State(state): State<AppState>) -> Result<Json<Vec<PageContent>>, ApiError> {
    tracing::info!("list_pages started");
    Ok(Json(state.store.list_pages().await?))
}

/// A page that was never edited comes back empty rather than 404 so the
/// editor can start from a blank form.
pub async fn get_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Query(query): Query<LangQuery>,
) -> Result<Json<PageContent>, ApiError> {
    tracing::info!("get_page started");
    let page = parse_page(&page)?;

    let mut content = state.store.get_page(page).await?.unwrap_or_else(|| PageContent {
        page,
        title: String::new(),
        content: String::new(),
        sections: Value::Object(Default::default()),
        updated_at: Utc::now(),
    });
    content.content = query.localize(content.content);
    Ok(Json(content))
}

pub async fn update_page(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(page): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<PagePayload>, ApiError>,
) -> Result<Json<PageContent>, ApiError> {
    tracing::info!("update_page started");
    let page = parse_page(&page)?;
    let draft = payload.validate()?;

    match state.store.upsert_page(page, draft).await {
        Ok(content) => {
            tracing::info!("update_page saved {}", page);
            Ok(Json(content))
        }
        Err(e) => {
            tracing::error!("update_page failed for {}: {:?}", page, &e);
            Err(e.into())
        }
    }
}
