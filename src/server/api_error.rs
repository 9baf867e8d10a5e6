use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::catalog_store::{CatalogError, ValidationErrors};

/// Every failure a catalog route can answer with.
#[derive(Debug)]
pub enum ApiError {
    Catalog(CatalogError),
    /// Query parameters that could not be parsed.
    InvalidQuery(ValidationErrors),
    Body(JsonRejection),
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Catalog(CatalogError::NotFound(kind)) => {
                detail(StatusCode::NOT_FOUND, kind.not_found_message())
            }
            ApiError::Catalog(CatalogError::Storage(err)) => {
                error!("Catalog storage failure: {:#}", err);
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.")
            }
            ApiError::Catalog(err) => match err.field_errors() {
                Some(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
                None => detail(StatusCode::BAD_REQUEST, err.to_string()),
            },
            ApiError::InvalidQuery(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::Body(JsonRejection::MissingJsonContentType(_)) => detail(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Unsupported media type in request, expected application/json.",
            ),
            ApiError::Body(rejection) => detail(
                StatusCode::BAD_REQUEST,
                format!("JSON parse error - {}", rejection.body_text()),
            ),
        }
    }
}
