use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar, WithRejection,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{self, Claims, ADMIN_COOKIE};
use crate::{ApiError, AppState};

/// Proof that the request carries a valid admin cookie.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub claims: Claims,
}

impl AdminSession {
    fn from_jar(jar: &CookieJar, state: &AppState) -> Result<Self, ApiError> {
        let token = jar.get(ADMIN_COOKIE).ok_or(ApiError::Unauthorized)?;
        let claims = auth::verify_token(&state.config.auth.jwt_secret, token.value())?;
        Ok(Self { claims })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        AdminSession::from_jar(&jar, state)
    }
}

/// Middleware guarding whole routers that are admin-only.
pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    tracing::trace!("require_admin started");
    if let Err(e) = AdminSession::from_jar(&jar, &state) {
        tracing::error!("require_admin rejected {} {}", req.method(), req.uri().path());
        return Err(e);
    }
    Ok(next.run(req).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<(CookieJar, Json<serde_json::Value>), ApiError> {
    tracing::info!("login started");
    if let Err(e) = auth::verify_password(&request.password, &state.config.auth.admin_password_hash) {
        tracing::error!("login failed: {}", e);
        return Err(e.into());
    }

    let token = auth::issue_token(&state.config.auth.jwt_secret)?;
    let cookie = Cookie::build((ADMIN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.auth.cookie_secure)
        .same_site(SameSite::Lax);

    tracing::info!("admin logged in");
    Ok((jar.add(cookie), Json(json!({ "status": "ok" }))))
}

/// POST /api/auth/logout
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    tracing::info!("logout started");
    let jar = jar.remove(Cookie::build(ADMIN_COOKIE).path("/"));
    (StatusCode::OK, jar, Json(json!({ "status": "ok" })))
}

/// GET /api/auth/session
pub async fn current_session(session: Option<AdminSession>) -> Json<serde_json::Value> {
    match session {
        Some(session) => Json(json!({ "isAdmin": true, "expiresAt": session.claims.exp })),
        None => Json(json!({ "isAdmin": false })),
    }
}
