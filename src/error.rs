use thiserror::Error;

use crate::types::RecordId;

#[derive(Error, Debug)]
pub enum AltTextError {
    #[error("No valid image files were provided")]
    NoValidImages,

    #[error("Failed to fetch image from {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Captioning API returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Captioning API returned no text")]
    EmptyCompletion,

    #[error("No generated alt text to export")]
    NothingToExport,

    #[error("No images to process")]
    NoImages,

    #[error("Invalid image URL: {0:?}")]
    InvalidUrl(String),

    #[error("Image {0} not found")]
    RecordNotFound(RecordId),

    #[error("Image {0} is already being processed")]
    RecordBusy(RecordId),

    #[error("A batch is already in progress")]
    BatchInProgress,

    #[error("Cannot connect to captioning API at {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Invalid response from captioning API: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl AltTextError {
    /// Whether this error describes the whole collection rather than one image.
    ///
    /// Collection-level errors become the orchestrator's transient notice;
    /// everything else is attached to the record that produced it.
    pub fn is_collection_level(&self) -> bool {
        matches!(
            self,
            AltTextError::NoValidImages | AltTextError::NothingToExport | AltTextError::NoImages
        )
    }
}

pub type Result<T> = std::result::Result<T, AltTextError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failed_mentions_url_and_reason() {
        let err = AltTextError::FetchFailed {
            url: "https://x.test/img.jpg".to_string(),
            reason: "HTTP 404 Not Found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://x.test/img.jpg"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn collection_level_classification() {
        assert!(AltTextError::NoValidImages.is_collection_level());
        assert!(AltTextError::NothingToExport.is_collection_level());
        assert!(AltTextError::NoImages.is_collection_level());
        assert!(!AltTextError::EmptyCompletion.is_collection_level());
        assert!(!AltTextError::BatchInProgress.is_collection_level());
    }
}
