use std::sync::{Mutex, MutexGuard};

use crate::error::{AltTextError, Result};
use crate::types::{ImageRecord, ImageSource, RecordId};

/// What a caller needs to run one captioning attempt outside the lock.
#[derive(Debug, Clone)]
pub struct Claim {
    pub source: ImageSource,
    pub mime_type: Option<String>,
}

/// Result of trying to claim a record for processing.
#[derive(Debug, Clone)]
pub enum ClaimResult {
    Claimed(Claim),
    /// An attempt is already in flight for this record.
    Busy,
    /// The record already has alt text or an error.
    Resolved,
    Missing,
}

/// Resolution of one captioning attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Captioned(String),
    Failed(String),
}

/// Ordered, in-memory store of image records.
///
/// All mutation goes through short critical sections; the lock is never held
/// while a record is being encoded or captioned.
#[derive(Default)]
pub struct Collection {
    records: Mutex<Vec<ImageRecord>>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<ImageRecord>>> {
        self.records
            .lock()
            .map_err(|e| AltTextError::Other(format!("collection mutex poisoned: {}", e)))
    }

    /// Append records, keeping their order.
    pub fn extend(&self, records: Vec<ImageRecord>) -> Result<Vec<RecordId>> {
        let mut guard = self.lock()?;
        let ids = records.iter().map(|r| r.id).collect();
        guard.extend(records);
        Ok(ids)
    }

    pub fn push(&self, record: ImageRecord) -> Result<RecordId> {
        let id = record.id;
        self.lock()?.push(record);
        Ok(id)
    }

    pub fn snapshot(&self) -> Vec<ImageRecord> {
        self.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn get(&self, id: RecordId) -> Option<ImageRecord> {
        let records = self.lock().ok()?;
        records.iter().find(|r| r.id == id).cloned()
    }

    /// Ids in collection order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.lock()
            .map(|r| r.iter().map(|rec| rec.id).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&self, id: RecordId) -> Result<Option<ImageRecord>> {
        let mut records = self.lock()?;
        Ok(records
            .iter()
            .position(|r| r.id == id)
            .map(|idx| records.remove(idx)))
    }

    /// Remove every record, returning them in order.
    pub fn drain(&self) -> Result<Vec<ImageRecord>> {
        Ok(std::mem::take(&mut *self.lock()?))
    }

    /// Claim a record for a fresh attempt, clearing any previous alt text or
    /// error. Refuses only if an attempt is already in flight.
    pub fn claim_for_retry(&self, id: RecordId) -> Result<ClaimResult> {
        self.claim(id, true)
    }

    /// Claim a record only if it has neither alt text nor an error.
    pub fn claim_unresolved(&self, id: RecordId) -> Result<ClaimResult> {
        self.claim(id, false)
    }

    fn claim(&self, id: RecordId, rearm: bool) -> Result<ClaimResult> {
        let mut records = self.lock()?;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(ClaimResult::Missing);
        };

        if record.is_processing {
            return Ok(ClaimResult::Busy);
        }
        if !rearm && !record.is_unresolved() {
            return Ok(ClaimResult::Resolved);
        }

        record.alt_text = None;
        record.status_error = None;
        record.is_processing = true;

        Ok(ClaimResult::Claimed(Claim {
            source: record.source.clone(),
            mime_type: record.mime_type.clone(),
        }))
    }

    /// Apply an attempt's outcome. Returns `false` if the record was removed
    /// while the attempt was in flight.
    pub fn commit(&self, id: RecordId, mime_type: Option<String>, outcome: Outcome) -> Result<bool> {
        let mut records = self.lock()?;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };

        if mime_type.is_some() {
            record.mime_type = mime_type;
        }
        match outcome {
            Outcome::Captioned(text) => {
                record.alt_text = Some(text);
                record.status_error = None;
            }
            Outcome::Failed(error) => {
                record.status_error = Some(error);
            }
        }
        record.is_processing = false;
        Ok(true)
    }
}
