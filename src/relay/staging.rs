//! Scratch storage for uploaded files.
//!
//! # Responsibilities
//! - Create the scratch directory on startup
//! - Give every staged file a collision-free name (`<uuid><ext>`)
//! - Remove staged files when the owning request is done with them
//!
//! # Design Decisions
//! - A request owns its files through a `StagedBatch`
//! - `release` removes files asynchronously on the normal path
//! - `Drop` removes whatever is still owned (early errors, cancellation)
//! - `persist` detaches the files so they outlive the request
//! - Removal failures are logged and counted, never returned

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::{self, File, OpenOptions};
use uuid::Uuid;

use crate::observability::metrics;

/// Directory in which uploads are staged.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the directory if it does not exist yet.
    pub async fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Start an empty batch for one request.
    pub fn batch(&self) -> StagedBatch {
        StagedBatch {
            root: self.root.clone(),
            files: Vec::new(),
        }
    }
}

/// A file written to scratch storage.
#[derive(Debug, Clone, Serialize)]
pub struct StagedFile {
    /// Generated name inside the scratch directory.
    #[serde(rename = "name")]
    pub stored_name: String,
    /// Filename as sent by the client.
    #[serde(rename = "original")]
    pub original_name: String,
    #[serde(skip)]
    pub mime_type: String,
    #[serde(skip)]
    pub path: PathBuf,
}

/// The staged files owned by a single request.
#[derive(Debug)]
pub struct StagedBatch {
    root: PathBuf,
    files: Vec<StagedFile>,
}

impl StagedBatch {
    /// Create a new, empty scratch file for `original_name` and take
    /// ownership of it.
    ///
    /// The file is registered before any bytes are written so a partial
    /// write is still cleaned up.
    pub async fn stage(&mut self, original_name: &str, mime_type: &str) -> io::Result<File> {
        let stored_name = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
        let path = self.root.join(&stored_name);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        tracing::debug!(stored = %stored_name, original = %original_name, "Staging upload");
        self.files.push(StagedFile {
            stored_name,
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            path,
        });
        Ok(file)
    }

    pub fn files(&self) -> &[StagedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Detach the files from the batch; they are no longer removed.
    pub fn persist(mut self) -> Vec<StagedFile> {
        std::mem::take(&mut self.files)
    }

    /// Remove every staged file.
    pub async fn release(mut self) {
        for file in self.files.drain(..) {
            if let Err(e) = fs::remove_file(&file.path).await {
                report_cleanup_failure(&file.path, &e);
            }
        }
    }
}

impl Drop for StagedBatch {
    fn drop(&mut self) {
        for file in self.files.drain(..) {
            if let Err(e) = std::fs::remove_file(&file.path) {
                report_cleanup_failure(&file.path, &e);
            }
        }
    }
}

fn report_cleanup_failure(path: &Path, e: &io::Error) {
    if e.kind() == io::ErrorKind::NotFound {
        return;
    }
    tracing::warn!(path = %path.display(), error = %e, "Failed to remove staged file");
    metrics::record_cleanup_failure();
}

/// Extension of the final path component, with its leading dot.
///
/// Only plain ASCII alphanumeric extensions are kept.
fn extension_of(original_name: &str) -> String {
    let last = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    match Path::new(last).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            format!(".{}", ext)
        }
        _ => String::new(),
    }
}
