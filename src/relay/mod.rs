//! Upload relay subsystem.
//!
//! # Data Flow
//! ```text
//! multipart request
//!     → intake.rs (validate parts, stream files to scratch)
//!     → staging.rs (StagedBatch owns the files)
//!     → local mode: respond with the staged names
//!     → forward mode: forward.rs (re-pack, POST upstream)
//!         → release staged files
//!         → relay upstream status/body or a synthesized error
//! ```
//!
//! # Design Decisions
//! - One linear pipeline per request, no shared state besides the scratch dir
//! - Every exit path releases the batch (explicitly or on drop)
//! - Errors are a closed set (`RelayError`) mapped uniformly to responses

pub mod error;
pub mod forward;
pub mod intake;
pub mod staging;

use axum::{
    extract::Multipart,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::{RelayConfig, UploadConfig};
use crate::observability::metrics;

pub use error::RelayError;
pub use forward::{Forwarder, UpstreamReply};
pub use staging::{ScratchDir, StagedBatch, StagedFile};

/// Whether uploads leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Local,
    Forward,
}

/// Body of a local-mode response.
#[derive(Debug, Serialize)]
pub struct LocalReceipt {
    pub ok: bool,
    pub message: &'static str,
    pub files: Vec<StagedFile>,
}

/// The per-request upload pipeline.
#[derive(Debug, Clone)]
pub struct Relay {
    rules: UploadConfig,
    scratch: ScratchDir,
    forwarder: Option<Forwarder>,
}

impl Relay {
    pub fn new(rules: UploadConfig, scratch: ScratchDir, forwarder: Option<Forwarder>) -> Self {
        Self {
            rules,
            scratch,
            forwarder,
        }
    }

    /// Build the relay described by `config`.
    pub fn from_config(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        let forwarder = config
            .upstream
            .forward_url()
            .map(|url| Forwarder::new(url, &config.upstream, config.uploads.field_name.clone()))
            .transpose()?;

        Ok(Self::new(
            config.uploads.clone(),
            ScratchDir::new(&config.uploads.scratch_dir),
            forwarder,
        ))
    }

    pub fn mode(&self) -> Mode {
        if self.forwarder.is_some() {
            Mode::Forward
        } else {
            Mode::Local
        }
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    /// Run one upload through the pipeline.
    pub async fn handle(&self, multipart: &mut Multipart) -> Result<Response, RelayError> {
        let upload = intake::receive(multipart, &self.rules, &self.scratch).await?;
        metrics::record_files_staged(upload.files.len());
        if upload.files.is_empty() {
            tracing::debug!(fields = upload.fields.len(), "Upload carried no files");
        }

        let Some(forwarder) = &self.forwarder else {
            let files = if self.rules.retain_in_local_mode {
                upload.files.persist()
            } else {
                let listed = upload.files.files().to_vec();
                upload.files.release().await;
                listed
            };
            tracing::info!(files = files.len(), "Upload kept locally");
            return Ok(Json(LocalReceipt {
                ok: true,
                message: "files saved locally",
                files,
            })
            .into_response());
        };

        let outcome = forwarder.forward(&upload.fields, upload.files.files()).await;
        upload.files.release().await;

        Ok(outcome?.into_response())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Hand-built multipart bodies for router and pipeline tests.

    pub const BOUNDARY: &str = "relay-test-boundary";

    pub enum Part<'a> {
        Text(&'a str, &'a str),
        File {
            field: &'a str,
            filename: &'a str,
            mime: &'a str,
            data: &'a [u8],
        },
    }

    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    pub fn body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut out = Vec::new();
        for part in parts {
            out.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    out.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    field,
                    filename,
                    mime,
                    data,
                } => {
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            field, filename, mime
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(data);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        out
    }
}
