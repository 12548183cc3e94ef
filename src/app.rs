use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::assistant::ContentAssistant;
use crate::image::{MediaStore, MAX_UPLOAD_BYTES};
use crate::store::BlogStore;
use crate::{
    archives, assistant, comments, feeds, health, image, pages, posts, seo, session, works, Config,
};

/// Multipart framing overhead allowed on top of the file itself.
const MULTIPART_SLACK_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn BlogStore>,
    pub media: Arc<dyn MediaStore>,
    pub assistant: Option<Arc<dyn ContentAssistant>>,
}

pub fn router(state: AppState) -> Router {
    let admin_only = Router::new()
        .route(
            "/api/upload",
            post(image::add_image)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_SLACK_BYTES)),
        )
        .route("/api/ai/summarize", post(assistant::summarize))
        .route("/api/ai/translate", post(assistant::translate))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_admin,
        ));

    let mut app = Router::new()
        .route("/api/healthcheck", get(health::health_check_handler))
        .route("/api/auth/login", post(session::login))
        .route("/api/auth/logout", post(session::logout))
        .route("/api/auth/session", get(session::current_session))
        .route("/api/posts", get(posts::list_posts).post(posts::add_post))
        .route(
            "/api/posts/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route(
            "/api/posts/:id/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route("/api/comments/:id", delete(comments::delete_comment))
        .route("/api/works", get(works::list_works).post(works::add_work))
        .route(
            "/api/works/:id",
            get(works::get_work)
                .put(works::update_work)
                .delete(works::delete_work),
        )
        .route(
            "/api/archives",
            get(archives::list_archives).post(archives::add_archive),
        )
        .route(
            "/api/archives/:id",
            get(archives::get_archive)
                .put(archives::update_archive)
                .delete(archives::delete_archive),
        )
        .route("/api/pages", get(pages::list_pages))
        .route("/api/pages/:page", get(pages::get_page).put(pages::update_page))
        .route("/api/seo/:kind/:key", get(seo::page_meta))
        .route("/rss.xml", get(feeds::rss))
        .route("/sitemap.xml", get(feeds::sitemap))
        .merge(admin_only);

    // local uploads are only served when they live under a path of this app
    let uploads = &state.config.uploads;
    if uploads.base_url.starts_with('/') {
        app = app.nest_service(&uploads.base_url, ServeDir::new(&uploads.dir));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
