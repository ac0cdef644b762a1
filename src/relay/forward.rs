//! Outbound forwarding of a staged upload to the remote backend.
//!
//! # Responsibilities
//! - Rebuild a multipart payload from the inbound fields and staged files
//! - POST it to the configured URL, bounded by the configured timeouts
//! - Classify the answer: success, upstream error, or transport error
//!
//! # Design Decisions
//! - Files are attached under the inbound field name with their original
//!   filename and MIME type, never the generated storage name
//! - Bodies that are not JSON, or are JSON `null`, are kept as `None`;
//!   callers synthesize a reply
//! - No retries

use std::time::{Duration, Instant};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

use crate::config::UpstreamConfig;
use crate::observability::metrics;
use crate::relay::error::RelayError;
use crate::relay::staging::StagedFile;

/// Successful answer from the remote backend.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl IntoResponse for UpstreamReply {
    fn into_response(self) -> Response {
        let body = self.body.unwrap_or_else(|| json!({ "ok": true }));
        (self.status, Json(body)).into_response()
    }
}

/// HTTP client bound to one remote upload URL.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    url: String,
    field_name: String,
}

impl Forwarder {
    pub fn new(
        url: impl Into<String>,
        config: &UpstreamConfig,
        field_name: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if config.connect_timeout_secs > 0 {
            builder = builder.connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        }
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }

        Ok(Self {
            client: builder.build()?,
            url: url.into(),
            field_name: field_name.into(),
        })
    }

    /// Send the fields and files upstream and wait for the answer.
    ///
    /// A non-success status is returned as `RelayError::Upstream`.
    pub async fn forward(
        &self,
        fields: &[(String, String)],
        files: &[StagedFile],
    ) -> Result<UpstreamReply, RelayError> {
        let form = self.build_form(fields, files).await?;
        let start = Instant::now();

        let result = self.exchange(form).await;
        metrics::record_upstream_latency(start);

        match &result {
            Ok(reply) => tracing::info!(
                url = %self.url,
                status = %reply.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Upstream accepted upload"
            ),
            Err(RelayError::Upstream { status, .. }) => tracing::warn!(
                url = %self.url,
                status = %status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Upstream rejected upload"
            ),
            Err(e) => tracing::error!(url = %self.url, error = %e, "Upstream request failed"),
        }

        result
    }

    async fn exchange(&self, form: Form) -> Result<UpstreamReply, RelayError> {
        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let body = parse_body(&bytes);

        if status.is_success() {
            Ok(UpstreamReply { status, body })
        } else {
            Err(RelayError::Upstream { status, body })
        }
    }

    async fn build_form(
        &self,
        fields: &[(String, String)],
        files: &[StagedFile],
    ) -> Result<Form, RelayError> {
        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name.clone(), value.clone());
        }

        for file in files {
            let bytes = tokio::fs::read(&file.path).await.map_err(|e| {
                RelayError::Transport(format!("could not read staged file {}: {}", file.stored_name, e))
            })?;
            let part = Part::bytes(bytes)
                .file_name(file.original_name.clone())
                .mime_str(&file.mime_type)?;
            form = form.part(self.field_name.clone(), part);
        }

        Ok(form)
    }
}

fn parse_body(bytes: &[u8]) -> Option<Value> {
    serde_json::from_slice::<Value>(bytes)
        .ok()
        .filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_non_json_bodies_are_absent() {
        assert_eq!(parse_body(b"null"), None);
        assert_eq!(parse_body(b" null\n"), None);
        assert_eq!(parse_body(b"<html>oops</html>"), None);
        assert_eq!(parse_body(b""), None);
        assert_eq!(parse_body(br#"{"id":7}"#), Some(json!({ "id": 7 })));
        assert_eq!(parse_body(b"false"), Some(json!(false)));
    }

    #[tokio::test]
    async fn null_reply_synthesizes_ok() {
        let reply = UpstreamReply {
            status: StatusCode::CREATED,
            body: parse_body(b"null"),
        };
        let response = reply.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "ok": true }));
    }

    #[test]
    fn zero_timeouts_build_an_unbounded_client() {
        let config = UpstreamConfig {
            timeout_secs: 0,
            connect_timeout_secs: 0,
            ..UpstreamConfig::default()
        };
        let forwarder = Forwarder::new("http://127.0.0.1:9/leads", &config, "files[]").unwrap();
        assert_eq!(forwarder.url, "http://127.0.0.1:9/leads");
    }
}
