//! Normalizes uploads and URLs into [`ImageRecord`]s.

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AltTextError, Result};
use crate::mime;
use crate::preview::PreviewRegistry;
use crate::types::{FileUpload, ImageRecord, ImageSource, RecordId};

/// Turn uploads into Local records, keeping only image-typed files.
///
/// Input order is preserved and each record gets a fresh id and preview
/// handle. Returns [`AltTextError::NoValidImages`] when at least one file was
/// given but none of them is an image; an empty input yields no records.
pub fn ingest_files(registry: &PreviewRegistry, files: Vec<FileUpload>) -> Result<Vec<ImageRecord>> {
    let offered = files.len();

    let records: Vec<ImageRecord> = files
        .into_iter()
        .filter(|file| {
            let keep = mime::is_image(&file.content_type);
            if !keep {
                debug!(name = %file.name, content_type = %file.content_type, "skipping non-image upload");
            }
            keep
        })
        .map(|file| ImageRecord {
            id: RecordId::new(),
            preview: Some(registry.mint()),
            mime_type: mime::essence(&file.content_type),
            source: ImageSource::Local {
                file_name: file.name,
                bytes: Arc::from(file.bytes),
            },
            alt_text: None,
            status_error: None,
            is_processing: false,
        })
        .collect();

    if offered > 0 && records.is_empty() {
        return Err(AltTextError::NoValidImages);
    }

    Ok(records)
}

/// Build a Remote record for a URL. The image is not fetched until it is
/// processed, so its MIME type stays unresolved here.
pub fn ingest_url(url: &str) -> Result<ImageRecord> {
    let url = url.trim();
    if url.is_empty() {
        return Err(AltTextError::InvalidUrl(url.to_string()));
    }

    Ok(ImageRecord {
        id: RecordId::new(),
        source: ImageSource::Remote {
            url: url.to_string(),
        },
        preview: None,
        mime_type: None,
        alt_text: None,
        status_error: None,
        is_processing: false,
    })
}

impl FileUpload {
    /// Read a file from disk, declaring its content type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self::new(name, mime::detect_mime_type(path), bytes))
    }
}
