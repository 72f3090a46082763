use serde::{Deserialize, Serialize};

use crate::types::{BatchSummary, RecordId};

/// State changes published by the orchestrator to its observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CollectionEvent {
    #[serde(rename_all = "camelCase")]
    RecordsAdded { ids: Vec<RecordId> },

    #[serde(rename_all = "camelCase")]
    RecordRemoved { id: RecordId },

    /// The collection was emptied; `released` preview handles were freed.
    #[serde(rename_all = "camelCase")]
    Cleared { removed: usize, released: usize },

    #[serde(rename_all = "camelCase")]
    ProcessingStarted { id: RecordId },

    #[serde(rename_all = "camelCase")]
    Captioned { id: RecordId, alt_text: String },

    #[serde(rename_all = "camelCase")]
    Failed { id: RecordId, error: String },

    #[serde(rename_all = "camelCase")]
    BatchStarted { total: usize },

    #[serde(rename_all = "camelCase")]
    BatchCompleted { summary: BatchSummary },
}
