//! Route handlers

pub mod category;
pub mod health;
pub mod task;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    http::StatusCode,
    Json, Router,
};
use tracing::error;

use notesphere_core::envelope::ApiResponse;
use notesphere_core::{Error, ErrorKind};

use crate::state::AppState;

pub type ApiError = (StatusCode, Json<ApiResponse<()>>);
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// All REST routes, without state
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(task::router())
        .merge(category::router())
}

/// Wrap a payload in a success envelope
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

fn failure(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::failure(message)))
}

/// Map a core error to a status code and failure envelope.
///
/// Unexpected failures are logged and reported with `fallback` so store
/// internals do not leak to clients.
pub fn error_response(err: Error, fallback: &str) -> ApiError {
    match err.kind() {
        ErrorKind::Validation => match err {
            Error::Validation { message, .. } => failure(StatusCode::BAD_REQUEST, message),
            other => failure(StatusCode::BAD_REQUEST, other.to_string()),
        },
        ErrorKind::ReferentialIntegrity => failure(StatusCode::BAD_REQUEST, err.to_string()),
        ErrorKind::NotFound => failure(StatusCode::NOT_FOUND, err.to_string()),
        ErrorKind::Unexpected => {
            error!("{}: {}", fallback, err);
            failure(StatusCode::INTERNAL_SERVER_ERROR, fallback)
        }
    }
}

/// Unwrap a JSON body, answering malformed input with a 400 envelope
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| failure(StatusCode::BAD_REQUEST, rejection.body_text()))
}

/// Unwrap a path parameter such as a malformed `{id}`
pub fn path_param<T>(param: Result<Path<T>, PathRejection>) -> Result<T, ApiError> {
    param
        .map(|Path(value)| value)
        .map_err(|rejection| failure(StatusCode::BAD_REQUEST, rejection.body_text()))
}

pub fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| failure(StatusCode::BAD_REQUEST, rejection.body_text()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use notesphere_core::store::{StoreConfig, StoreGateway};

    use crate::state::AppState;

    pub async fn build_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = StoreConfig::for_file(temp_dir.path().join("notesphere.db"))
            .with_max_connections(4);
        let gateway = StoreGateway::connect(&config).await.unwrap();
        (AppState::new(gateway), temp_dir)
    }

    pub fn app(state: AppState) -> Router {
        super::router().with_state(state)
    }

    /// Send a request and decode the JSON envelope
    pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let (status, Json(body)) = error_response(
            Error::validation("title", "Title cannot be empty"),
            "Failed to create task",
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.as_deref(), Some("Title cannot be empty"));

        let (status, _) = error_response(Error::TaskNotFound(4), "Failed to fetch task");
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = error_response(
            Error::ReferentialIntegrity("categories do not exist: 9".into()),
            "Failed to update task",
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, Json(body)) = error_response(
            Error::Transport("disk on fire".into()),
            "Failed to fetch tasks",
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.as_deref(), Some("Failed to fetch tasks"));
        assert!(!body.success);
    }
}
