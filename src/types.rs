use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::preview::PreviewHandle;

/// Opaque identifier assigned to an image at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(uuid::Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Where an image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    Local,
    Remote,
}

/// The image payload: uploaded bytes or a URL to fetch on demand.
#[derive(Clone)]
pub enum ImageSource {
    Local { file_name: String, bytes: Arc<[u8]> },
    Remote { url: String },
}

impl ImageSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            ImageSource::Local { .. } => SourceKind::Local,
            ImageSource::Remote { .. } => SourceKind::Remote,
        }
    }

    /// Original filename for uploads, the URL for remote images.
    pub fn label(&self) -> &str {
        match self {
            ImageSource::Local { file_name, .. } => file_name,
            ImageSource::Remote { url } => url,
        }
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Local { file_name, bytes } => f
                .debug_struct("Local")
                .field("file_name", file_name)
                .field("len", &bytes.len())
                .finish(),
            ImageSource::Remote { url } => f.debug_struct("Remote").field("url", url).finish(),
        }
    }
}

/// Derived per-record state, as shown to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordStatus {
    Pending,
    Processing,
    Captioned,
    Failed,
}

/// One tracked image and its captioning state.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: RecordId,
    pub source: ImageSource,
    /// Temporary preview reference for uploads. Remote images preview from their URL.
    pub preview: Option<PreviewHandle>,
    /// Known at intake for uploads; resolved by the first successful fetch for URLs.
    pub mime_type: Option<String>,
    pub alt_text: Option<String>,
    pub status_error: Option<String>,
    pub is_processing: bool,
}

impl ImageRecord {
    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn label(&self) -> &str {
        self.source.label()
    }

    /// Displayable reference for this image.
    pub fn preview_ref(&self) -> &str {
        match (&self.preview, &self.source) {
            (Some(handle), _) => handle.as_str(),
            (None, source) => source.label(),
        }
    }

    /// No alt text, no error, nothing in flight.
    pub fn is_unresolved(&self) -> bool {
        !self.is_processing && !has_text(&self.alt_text) && !has_text(&self.status_error)
    }

    pub fn status(&self) -> RecordStatus {
        if self.is_processing {
            RecordStatus::Processing
        } else if has_text(&self.status_error) {
            RecordStatus::Failed
        } else if has_text(&self.alt_text) {
            RecordStatus::Captioned
        } else {
            RecordStatus::Pending
        }
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

/// An image handed to intake: a name, a declared content type and its bytes.
#[derive(Clone)]
pub struct FileUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Base64 payload ready to send to the captioning API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

/// Outcome counts for one pass of [`Orchestrator::process_batch`](crate::Orchestrator::process_batch).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Records already resolved, in flight elsewhere, or removed mid-batch.
    pub skipped: usize,
    pub duration_ms: u64,
}
