use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use mtx_publish::PublishError;
use mtx_sdk::SdkError;
use mtx_store::StoreError;
use mtx_tools::ToolError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        Self::Sdk(err.into())
    }
}

impl From<ToolError> for ServerError {
    fn from(err: ToolError) -> Self {
        Self::Sdk(err.into())
    }
}

impl From<mtx_types::TypeError> for ServerError {
    fn from(err: mtx_types::TypeError) -> Self {
        Self::Sdk(err.into())
    }
}

impl From<mtx_types::PathError> for ServerError {
    fn from(err: mtx_types::PathError) -> Self {
        Self::Sdk(err.into())
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

/// JSON error body: `{"error": <kind>, "message": <text>}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ServerError {
    /// HTTP status and stable error kind.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Sdk(err) => classify_sdk(err),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal")
            }
        }
    }
}

fn classify_sdk(err: &SdkError) -> (StatusCode, &'static str) {
    match err {
        SdkError::Store(e) => classify_store(e),
        SdkError::Tool(e) => classify_tool(e),
        SdkError::Publish(PublishError::PublishFailed(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "PublishFailed")
        }
        SdkError::Sync(mtx_sync::SyncError::PartialFailure { .. }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "SyncPartialFailure")
        }
        SdkError::PublishDisabled => (StatusCode::BAD_REQUEST, "PublishDisabled"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
    }
}

fn classify_store(err: &StoreError) -> (StatusCode, &'static str) {
    match err {
        StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
        StoreError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "InvalidPath"),
        StoreError::IndexOutOfRange { .. } => (StatusCode::BAD_REQUEST, "IndexOutOfRange"),
        StoreError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
        StoreError::Conflict { .. } => (StatusCode::CONFLICT, "Conflict"),
        StoreError::Malformed { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "MalformedDocument"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
    }
}

fn classify_tool(err: &ToolError) -> (StatusCode, &'static str) {
    match err {
        ToolError::Store(e) => classify_store(e),
        ToolError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
        ToolError::StaleValue { .. } => (StatusCode::CONFLICT, "StaleValue"),
        ToolError::UnknownTool(_) => (StatusCode::NOT_FOUND, "UnknownTool"),
        ToolError::Interpreter(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InterpreterError"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = self.classify();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: kind,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtx_types::{PageId, Revision};

    fn status_of(err: impl Into<ServerError>) -> (StatusCode, &'static str) {
        err.into().classify()
    }

    #[test]
    fn store_errors() {
        let page = PageId::parse("home").unwrap();
        assert_eq!(
            status_of(StoreError::NotFound(page.clone())),
            (StatusCode::NOT_FOUND, "NotFound")
        );
        assert_eq!(
            status_of(StoreError::IndexOutOfRange {
                path: "features".into(),
                index: 9,
                len: 3
            }),
            (StatusCode::BAD_REQUEST, "IndexOutOfRange")
        );
        assert_eq!(
            status_of(StoreError::Conflict {
                page,
                expected: Revision::of(b"a"),
                actual: Revision::of(b"b"),
            }),
            (StatusCode::CONFLICT, "Conflict")
        );
    }

    #[test]
    fn tool_errors() {
        assert_eq!(
            status_of(ToolError::StaleValue {
                path: "a".into(),
                expected: None,
                actual: Some("x".into()),
            }),
            (StatusCode::CONFLICT, "StaleValue")
        );
        assert_eq!(
            status_of(ToolError::Store(StoreError::InvalidPath("..".into()))),
            (StatusCode::BAD_REQUEST, "InvalidPath")
        );
    }

    #[test]
    fn publish_errors() {
        assert_eq!(
            status_of(SdkError::Publish(PublishError::PublishFailed("x".into()))),
            (StatusCode::INTERNAL_SERVER_ERROR, "PublishFailed")
        );
        assert_eq!(
            status_of(SdkError::PublishDisabled),
            (StatusCode::BAD_REQUEST, "PublishDisabled")
        );
    }
}
