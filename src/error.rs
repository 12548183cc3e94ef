use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::{
    assistant::AssistantError, auth::AuthError, image::MediaError, store::StoreError,
    validation::ValidationErrors,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} is not configured")]
    Unavailable(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Media(e) if e.is_rejection() => StatusCode::BAD_REQUEST,
            ApiError::Auth(e) if e.is_rejection() => StatusCode::UNAUTHORIZED,
            ApiError::Store(_) | ApiError::Media(_) | ApiError::Assistant(_) | ApiError::Auth(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::BadRequest("uploads are limited to 10MB".to_string());
        }
        ApiError::BadRequest(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Validation(errors) => json!({
                "status": "fail",
                "message": "Validation failed",
                "errors": errors,
            }),
            _ if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE => {
                tracing::error!("request failed: {:?}", &self);
                json!({
                    "status": "fail",
                    "message": "Internal server error"
                })
            }
            _ => json!({
                "status": "fail",
                "message": self.to_string()
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("work").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Media(MediaError::TooLarge { size: 11 << 20 }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Store(StoreError::Decode("bad row".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Auth(AuthError::InvalidToken).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn server_errors_hide_details() {
        let response = ApiError::Store(StoreError::Decode("secret detail".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
