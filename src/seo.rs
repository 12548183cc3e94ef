//! Search/social metadata for public pages.
//!
//! The frontend asks for `/api/seo/:kind/:key` while rendering a page and
//! inlines the returned `html` fragment into its `<head>`.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use strum::{AsRefStr, EnumString};

use crate::config::SiteConfig;
use crate::content::{bilingual, cloudinary, escape_markup, LangQuery};
use crate::models::PageName;
use crate::{excerpt, first_image_src, ApiError, AppState};

pub const DESCRIPTION_CHARS: usize = 160;
pub const OG_IMAGE_WIDTH: u32 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum MetaKind {
    Posts,
    Works,
    Archives,
    Pages,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub image: Option<String>,
    pub og_type: &'static str,
}

impl PageMeta {
    /// Builds metadata for a record rendered at `path`. An empty title or
    /// description falls back to the site's own.
    pub fn build(
        site: &SiteConfig,
        path: &str,
        title: &str,
        html: &str,
        image: Option<&str>,
        og_type: &'static str,
    ) -> Self {
        let title = match title.trim() {
            "" => site.title.clone(),
            t if t == site.title => t.to_string(),
            t => format!("{} | {}", t, site.title),
        };

        let description = match excerpt(html, DESCRIPTION_CHARS) {
            d if d.is_empty() => site.description.clone(),
            d => d,
        };

        let image = image
            .map(str::to_string)
            .or_else(|| first_image_src(html))
            .map(|src| absolute_url(&site.url, &cloudinary::optimize_url(&src, Some(OG_IMAGE_WIDTH))));

        PageMeta {
            title,
            description,
            canonical: absolute_url(&site.url, path),
            image,
            og_type,
        }
    }

    /// `<title>`, description, canonical link and Open Graph/Twitter tags.
    pub fn render_tags(&self, site_name: &str) -> String {
        let title = escape_markup(&self.title);
        let description = escape_markup(&self.description);
        let canonical = escape_markup(&self.canonical);

        let mut tags = vec![
            format!("<title>{}</title>", title),
            format!(r#"<meta name="description" content="{}">"#, description),
            format!(r#"<link rel="canonical" href="{}">"#, canonical),
            format!(r#"<meta property="og:site_name" content="{}">"#, escape_markup(site_name)),
            format!(r#"<meta property="og:type" content="{}">"#, self.og_type),
            format!(r#"<meta property="og:title" content="{}">"#, title),
            format!(r#"<meta property="og:description" content="{}">"#, description),
            format!(r#"<meta property="og:url" content="{}">"#, canonical),
        ];

        match &self.image {
            Some(image) => {
                let image = escape_markup(image);
                tags.push(format!(r#"<meta property="og:image" content="{}">"#, image));
                tags.push(r#"<meta name="twitter:card" content="summary_large_image">"#.to_string());
                tags.push(format!(r#"<meta name="twitter:image" content="{}">"#, image));
            }
            None => tags.push(r#"<meta name="twitter:card" content="summary">"#.to_string()),
        }
        tags.join("\n")
    }
}

fn absolute_url(site_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}/{}", site_url, path.trim_start_matches('/'))
}

/// Meta tags describe one language at a time, Korean unless `?lang=` says
/// otherwise.
fn meta_source(query: &LangQuery, content: &str) -> String {
    bilingual::split(content)
        .pick(query.lang.unwrap_or_default())
        .to_string()
}

pub async fn page_meta(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
    Query(query): Query<LangQuery>,
) -> Result<Json<Value>, ApiError> {
    tracing::info!("page_meta started for {}/{}", kind, key);
    let kind = MetaKind::from_str(&kind).map_err(|_| ApiError::NotFound("page"))?;
    let site = &state.config.site;

    let meta = match kind {
        MetaKind::Posts => {
            let post = state.store.get_post(&key).await?.ok_or(ApiError::NotFound("post"))?;
            let content = meta_source(&query, &post.content);
            PageMeta::build(site, &format!("/posts/{}", post.id), &post.title, &content, None, "article")
        }
        MetaKind::Works => {
            let work = state
                .store
                .get_work(&key)
                .await?
                .filter(|w| w.published)
                .ok_or(ApiError::NotFound("work"))?;
            let content = meta_source(&query, &work.content);
            PageMeta::build(
                site,
                &format!("/work/{}", work.id),
                &work.title,
                &content,
                work.thumbnail.as_deref(),
                "article",
            )
        }
        MetaKind::Archives => {
            let archive = state
                .store
                .get_archive(&key)
                .await?
                .filter(|a| a.published)
                .ok_or(ApiError::NotFound("archive"))?;
            let content = meta_source(&query, &archive.content);
            PageMeta::build(
                site,
                &format!("/archive/{}", archive.id),
                &archive.title,
                &content,
                None,
                "article",
            )
        }
        MetaKind::Pages => {
            let page = PageName::from_str(&key).map_err(|_| ApiError::NotFound("page"))?;
            let (title, content) = match state.store.get_page(page).await? {
                Some(p) => {
                    let content = meta_source(&query, &p.content);
                    (p.title, content)
                }
                None => (String::new(), String::new()),
            };
            PageMeta::build(site, page.path(), &title, &content, None, "website")
        }
    };

    let html = meta.render_tags(&site.title);
    Ok(Json(json!({ "meta": meta, "html": html })))
}
