//! # alt-text-batch
//!
//! Accessibility alt text for batches of images, generated by a multimodal
//! captioning API.
//!
//! ## Features
//!
//! - **Uploads and URLs** — in-memory uploads or files on disk, filtered to
//!   image types, plus remote images fetched on demand
//! - **Sequential batches** — one captioning call in flight at a time, in
//!   collection order, with failures recorded per image
//! - **Regeneration** — re-run any single image, clearing its previous result
//! - **CSV export** — `Filename/URL,Generated Alt Text` with proper quoting
//! - **Observable state** — snapshots and a broadcast event stream
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alt_text_batch::{AltTextConfig, FileUpload, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AltTextConfig::with_api_key("your-key");
//!     let orchestrator = Orchestrator::from_config(config)?;
//!
//!     orchestrator.add_files(vec![FileUpload::from_path("cat.jpg").await?])?;
//!     orchestrator.add_url_record("https://example.com/dog.png")?;
//!
//!     let summary = orchestrator.process_batch().await?;
//!     println!("{} captioned, {} failed", summary.succeeded, summary.failed);
//!
//!     println!("{}", orchestrator.export_csv()?);
//!     Ok(())
//! }
//! ```

pub mod captioner;
pub mod collection;
pub mod config;
pub mod encoder;
pub mod error;
pub mod events;
pub mod export;
pub mod intake;
pub mod mime;
pub mod orchestrator;
pub mod preview;
pub mod types;

pub use captioner::{Captioner, GeminiCaptioner, ALT_TEXT_PROMPT};
pub use collection::Outcome;
pub use config::{AltTextConfig, AltTextConfigBuilder};
pub use encoder::{encode, FetchedImage, HttpFetcher, ImageFetcher};
pub use error::{AltTextError, Result};
pub use events::CollectionEvent;
pub use export::{export_csv, CSV_HEADER};
pub use intake::{ingest_files, ingest_url};
pub use orchestrator::Orchestrator;
pub use preview::{PreviewHandle, PreviewRegistry};
pub use types::{
    BatchSummary, EncodedImage, FileUpload, ImageRecord, ImageSource, RecordId, RecordStatus,
    SourceKind,
};
