//! Error taxonomy for a single upload request.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

/// Errors that end the handling of an upload request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The inbound request was rejected before anything was forwarded.
    #[error("{0}")]
    Validation(String),

    /// The remote backend answered with a non-success status.
    #[error("upstream responded with {status}")]
    Upstream {
        status: StatusCode,
        body: Option<Value>,
    },

    /// The remote backend could not be reached or its answer could not be read.
    #[error("{0}")]
    Transport(String),
}

impl RelayError {
    /// Label used for the `relay_requests_total` outcome dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => "rejected",
            RelayError::Upstream { .. } => "upstream_error",
            RelayError::Transport(_) => "transport_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => *status,
            RelayError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Transport(e.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            RelayError::Upstream { status, body } => {
                body.unwrap_or_else(|| json!({ "ok": false, "status": status.as_u16() }))
            }
            other => json!({ "ok": false, "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_maps_to_bad_request() {
        let response = RelayError::Validation("file type not permitted".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "ok": false, "error": "file type not permitted" })
        );
    }

    #[tokio::test]
    async fn transport_maps_to_internal_error() {
        let response = RelayError::Transport("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "ok": false, "error": "connection refused" })
        );
    }

    #[tokio::test]
    async fn upstream_relays_status_and_body() {
        let response = RelayError::Upstream {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: Some(json!({ "error": "email missing" })),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await, json!({ "error": "email missing" }));
    }

    #[tokio::test]
    async fn upstream_without_json_synthesizes_body() {
        let response = RelayError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            body: None,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await, json!({ "ok": false, "status": 502 }));
    }
}
