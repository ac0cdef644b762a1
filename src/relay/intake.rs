//! Multipart intake: validates file parts and streams them to scratch storage.
//!
//! Validation happens while the stream is parsed. The first violation aborts
//! the whole request, and the partially filled batch is dropped (which removes
//! anything already staged).

use axum::extract::multipart::{Multipart, MultipartError};
use tokio::io::AsyncWriteExt;

use crate::config::UploadConfig;
use crate::relay::error::RelayError;
use crate::relay::staging::{ScratchDir, StagedBatch};

/// A parsed and staged upload request.
#[derive(Debug)]
pub struct Upload {
    /// Text fields in arrival order, duplicates included.
    pub fields: Vec<(String, String)>,
    pub files: StagedBatch,
}

/// Consume the multipart stream, staging accepted files.
pub async fn receive(
    multipart: &mut Multipart,
    rules: &UploadConfig,
    scratch: &ScratchDir,
) -> Result<Upload, RelayError> {
    let mut files = scratch.batch();
    let mut fields = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(original) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(malformed)?;
            fields.push((name, value));
            continue;
        };

        // An empty file input still submits a part, with no filename.
        if original.is_empty() {
            while field.chunk().await.map_err(malformed)?.is_some() {}
            tracing::debug!(field = %name, "Skipped file part without a filename");
            continue;
        }

        if name != rules.field_name {
            tracing::warn!(field = %name, "Rejected file under unexpected field");
            return Err(RelayError::Validation(format!("unexpected file field: {}", name)));
        }

        if files.len() >= rules.max_files {
            tracing::warn!(limit = rules.max_files, "Rejected upload with too many files");
            return Err(RelayError::Validation(format!(
                "too many files: at most {} allowed",
                rules.max_files
            )));
        }

        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if !rules.allows(&mime_type) {
            tracing::warn!(mime = %mime_type, file = %original, "Rejected file type");
            return Err(RelayError::Validation("file type not permitted".to_string()));
        }

        let mut out = files.stage(&original, &mime_type).await.map_err(staging_failed)?;
        let mut written: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            written += chunk.len() as u64;
            if written > rules.max_file_size {
                tracing::warn!(file = %original, limit = rules.max_file_size, "Rejected oversized file");
                return Err(RelayError::Validation(format!(
                    "file too large: limit is {} bytes",
                    rules.max_file_size
                )));
            }
            out.write_all(&chunk).await.map_err(staging_failed)?;
        }
        out.flush().await.map_err(staging_failed)?;

        tracing::debug!(file = %original, mime = %mime_type, bytes = written, "File staged");
    }

    Ok(Upload { fields, files })
}

fn malformed(e: MultipartError) -> RelayError {
    tracing::warn!(error = %e, "Malformed multipart body");
    RelayError::Validation(e.body_text())
}

fn staging_failed(e: std::io::Error) -> RelayError {
    tracing::error!(error = %e, "Failed to write upload to scratch storage");
    RelayError::Validation(format!("could not store upload: {}", e))
}
