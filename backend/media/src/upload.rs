//! Upload validation: the gate every user-chosen file passes before any
//! network call is made.

use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use payguide_core::{ImageBuffer, ScanError};
use tracing::debug;

use crate::mime_detect::{is_image, resolve_mime_type};
use crate::shape::{check_shape, AspectRange};

/// Maximum image size (10MB)
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A file as handed over by the upload control.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    /// Declared MIME type; detected from the name or content when absent.
    pub mime_type: Option<String>,
    pub data: Bytes,
}

/// Limits applied to uploads.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    /// Optional banknote proportion check.
    pub aspect_ratio: Option<AspectRange>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: MAX_UPLOAD_BYTES,
            aspect_ratio: None,
        }
    }
}

/// Read a file from disk without validating it.
pub async fn read_upload(path: &Path) -> Result<UploadedFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image file: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = resolve_mime_type(path, &data);
    Ok(UploadedFile {
        name,
        mime_type: Some(mime_type),
        data: Bytes::from(data),
    })
}

/// Check type, emptiness, size, and (optionally) shape of an upload.
pub fn validate_upload(file: UploadedFile, policy: &UploadPolicy) -> Result<ImageBuffer, ScanError> {
    let mime = match file.mime_type {
        Some(m) if !m.trim().is_empty() => m.trim().to_ascii_lowercase(),
        _ => resolve_mime_type(Path::new(&file.name), &file.data),
    };

    if !is_image(&mime) {
        return Err(ScanError::InvalidFileType(mime));
    }
    if file.data.is_empty() {
        return Err(ScanError::InvalidFileType(format!("{mime} (empty file)")));
    }
    let max = policy.max_bytes.min(MAX_UPLOAD_BYTES);
    if file.data.len() > max {
        return Err(ScanError::FileTooLarge { size: file.data.len(), max });
    }

    if let Some(range) = &policy.aspect_ratio {
        check_shape(&file.data, range)?;
    }

    debug!(name = %file.name, mime = %mime, bytes = file.data.len(), "Upload accepted");
    Ok(ImageBuffer::new(file.data, mime, file.name))
}
