use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use care_core::ValidationError;
use serde::Serialize;
use uuid::Uuid;

use crate::store::StoreError;

/// Error returned by every handler, rendered as `{"error": {...}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed request: {0}")]
    BadRequest(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} {id} was modified concurrently, reload and retry")]
    Conflict { entity: &'static str, id: Uuid },

    #[error("referenced {entity} {id} does not exist")]
    MissingReference { entity: &'static str, id: Uuid },

    #[error("storage failure")]
    Storage(#[source] StoreError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) | Self::MissingReference { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::MissingReference { .. } => "MISSING_REFERENCE",
            Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation(err) => err.field(),
            Self::MissingReference { entity, .. } => Some(reference_field(entity)),
            _ => None,
        }
    }
}

fn reference_field(entity: &str) -> &'static str {
    match entity {
        "patient" => "patientId",
        "todo" => "todoId",
        _ => "id",
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::VersionConflict { entity, id, .. } => Self::Conflict { entity, id },
            StoreError::MissingReference { entity, id } => Self::MissingReference { entity, id },
            other => Self::Storage(other),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Storage details stay in the log.
        let message = match &self {
            Self::Storage(source) => {
                tracing::error!(error = %source, "storage operation failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
                field: self.field(),
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_maps_to_400_with_field() {
        let err = ApiError::from(ValidationError::EmptyText { field: "title" });
        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(body["error"]["field"], "title");
        assert_eq!(body["error"]["message"], "title must not be empty");
    }

    #[tokio::test]
    async fn test_not_found_has_no_field() {
        let id = Uuid::nil();
        let (status, body) = body_json(ApiError::not_found("patient", id)).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert!(body["error"].get("field").is_none());
    }

    #[tokio::test]
    async fn test_store_errors_map_by_kind() {
        let id = Uuid::new_v4();

        let conflict = ApiError::from(StoreError::VersionConflict {
            entity: "todo",
            id,
            expected: 3,
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing = ApiError::from(StoreError::MissingReference {
            entity: "patient",
            id,
        });
        let (status, body) = body_json(missing).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "patientId");
    }

    #[tokio::test]
    async fn test_storage_message_is_generic() {
        let err = ApiError::from(StoreError::Corrupt("bad category 'x'".to_string()));
        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "internal server error");
    }
}
