//! Owns the image collection and drives the captioning pipeline over it.

use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::captioner::{Captioner, GeminiCaptioner};
use crate::collection::{Claim, ClaimResult, Collection, Outcome};
use crate::config::AltTextConfig;
use crate::encoder::{self, HttpFetcher, ImageFetcher};
use crate::error::{AltTextError, Result};
use crate::events::CollectionEvent;
use crate::export;
use crate::intake;
use crate::preview::PreviewRegistry;
use crate::types::{BatchSummary, FileUpload, ImageRecord, RecordId};

const EVENT_CAPACITY: usize = 256;

const INTERRUPTED: &str = "processing was interrupted";

/// Clears the batch flag when the batch ends, however it ends.
struct BatchGuard<'a>(&'a AtomicBool);

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Fails a claimed record if its attempt is dropped before it finishes, so
/// the processing flag never outlives the attempt.
struct ClaimGuard<'a, C, F>
where
    C: Captioner,
    F: ImageFetcher,
{
    orchestrator: &'a Orchestrator<C, F>,
    id: RecordId,
    armed: bool,
}

impl<'a, C, F> ClaimGuard<'a, C, F>
where
    C: Captioner,
    F: ImageFetcher,
{
    fn new(orchestrator: &'a Orchestrator<C, F>, id: RecordId) -> Self {
        Self {
            orchestrator,
            id,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<C, F> Drop for ClaimGuard<'_, C, F>
where
    C: Captioner,
    F: ImageFetcher,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self
            .orchestrator
            .finish(self.id, None, Outcome::Failed(INTERRUPTED.to_string()))
        {
            warn!(id = %self.id, error = %e, "could not release interrupted record");
        }
    }
}

/// Entry point for a presentation layer.
///
/// Holds the collection, the captioning client and the image fetcher.
/// Callers read state through [`snapshot`](Self::snapshot) or
/// [`subscribe`](Self::subscribe) and change it only through the intent
/// methods. Share it across tasks with `Arc`.
pub struct Orchestrator<C, F>
where
    C: Captioner,
    F: ImageFetcher,
{
    captioner: C,
    fetcher: F,
    collection: Collection,
    previews: PreviewRegistry,
    notice: Mutex<Option<String>>,
    batch_running: AtomicBool,
    events: broadcast::Sender<CollectionEvent>,
}

impl Orchestrator<GeminiCaptioner, HttpFetcher> {
    /// Build with the HTTP captioner and fetcher sharing one reqwest client.
    pub fn from_config(config: AltTextConfig) -> Result<Self> {
        let client = Client::new();
        let fetcher = HttpFetcher::new(client.clone(), config.timeout);
        let captioner = GeminiCaptioner::new(client, config)?;
        Ok(Self::new(captioner, fetcher))
    }
}

impl<C, F> Orchestrator<C, F>
where
    C: Captioner,
    F: ImageFetcher,
{
    pub fn new(captioner: C, fetcher: F) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            captioner,
            fetcher,
            collection: Collection::new(),
            previews: PreviewRegistry::new(),
            notice: Mutex::new(None),
            batch_running: AtomicBool::new(false),
            events,
        }
    }

    // -- Read access --

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.events.subscribe()
    }

    /// Clone of every record, in collection order.
    pub fn snapshot(&self) -> Vec<ImageRecord> {
        self.collection.snapshot()
    }

    pub fn get(&self, id: RecordId) -> Option<ImageRecord> {
        self.collection.get(id)
    }

    pub fn len(&self) -> usize {
        self.collection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// The current collection-level message, if any.
    pub fn notice(&self) -> Option<String> {
        self.notice.lock().ok().and_then(|n| n.clone())
    }

    pub fn is_batch_running(&self) -> bool {
        self.batch_running.load(Ordering::SeqCst)
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    // -- Intents --

    /// Add uploads. Non-image files are dropped; if nothing remains the
    /// notice is set and [`AltTextError::NoValidImages`] returned.
    pub fn add_files(&self, files: Vec<FileUpload>) -> Result<Vec<RecordId>> {
        self.begin_intent();
        let records = self.report(intake::ingest_files(&self.previews, files))?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.collection.extend(records)?;
        debug!(count = ids.len(), "added uploads");
        self.emit(CollectionEvent::RecordsAdded { ids: ids.clone() });
        Ok(ids)
    }

    /// Add a remote image without processing it.
    pub fn add_url_record(&self, url: &str) -> Result<RecordId> {
        self.begin_intent();
        let record = intake::ingest_url(url)?;
        let id = self.collection.push(record)?;
        debug!(%id, %url, "added remote image");
        self.emit(CollectionEvent::RecordsAdded { ids: vec![id] });
        Ok(id)
    }

    /// Add a remote image and caption it right away.
    ///
    /// The returned outcome is also recorded on the record; a failed fetch or
    /// captioning call is not an `Err` here.
    pub async fn add_url(&self, url: &str) -> Result<(RecordId, Outcome)> {
        let id = self.add_url_record(url)?;
        let outcome = self.process_one(id).await?;
        Ok((id, outcome))
    }

    /// Remove one record, releasing its preview handle. Returns `false` if no
    /// such record exists.
    pub fn remove(&self, id: RecordId) -> Result<bool> {
        self.begin_intent();
        let Some(record) = self.collection.remove(id)? else {
            return Ok(false);
        };

        if let Some(handle) = &record.preview {
            self.previews.release(handle);
        }
        if record.is_processing {
            debug!(%id, "removed record with an attempt in flight");
        }
        self.emit(CollectionEvent::RecordRemoved { id });
        Ok(true)
    }

    /// Remove every record. Returns the number of preview handles released.
    pub fn clear(&self) -> Result<usize> {
        self.begin_intent();
        let records = self.collection.drain()?;
        let released = records
            .iter()
            .filter_map(|r| r.preview.as_ref())
            .filter(|handle| self.previews.release(handle))
            .count();

        debug!(removed = records.len(), released, "cleared collection");
        self.emit(CollectionEvent::Cleared {
            removed: records.len(),
            released,
        });
        Ok(released)
    }

    /// Caption one record, discarding any previous alt text or error first.
    ///
    /// # Errors
    ///
    /// [`AltTextError::RecordNotFound`] for an unknown id and
    /// [`AltTextError::RecordBusy`] if an attempt is already in flight.
    /// Pipeline failures are returned as [`Outcome::Failed`] and stored on
    /// the record. Dropping the future mid-attempt stores a failure too.
    pub async fn process_one(&self, id: RecordId) -> Result<Outcome> {
        self.begin_intent();
        let claim = match self.collection.claim_for_retry(id)? {
            ClaimResult::Claimed(claim) => claim,
            ClaimResult::Busy => return Err(AltTextError::RecordBusy(id)),
            ClaimResult::Missing | ClaimResult::Resolved => {
                return Err(AltTextError::RecordNotFound(id))
            }
        };

        let guard = ClaimGuard::new(self, id);
        self.emit(CollectionEvent::ProcessingStarted { id });
        let (mime_type, outcome) = self.process(&claim).await;
        guard.disarm();
        self.finish(id, mime_type, outcome.clone())?;
        Ok(outcome)
    }

    /// Explicitly re-run captioning for one record.
    pub async fn regenerate(&self, id: RecordId) -> Result<Outcome> {
        self.process_one(id).await
    }

    /// Caption every record that has neither alt text nor an error, one at a
    /// time in collection order.
    ///
    /// A failure is recorded on its record and the batch moves on. Records
    /// added after the batch starts are left for the next batch.
    pub async fn process_batch(&self) -> Result<BatchSummary> {
        self.begin_intent();
        if self.collection.is_empty() {
            return self.report(Err(AltTextError::NoImages));
        }

        if self
            .batch_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AltTextError::BatchInProgress);
        }
        let _guard = BatchGuard(&self.batch_running);

        let ids = self.collection.ids();
        let start = Instant::now();
        let mut summary = BatchSummary {
            total: ids.len(),
            ..Default::default()
        };

        info!(total = ids.len(), "batch started");
        self.emit(CollectionEvent::BatchStarted { total: ids.len() });

        for id in ids {
            let claim = match self.collection.claim_unresolved(id)? {
                ClaimResult::Claimed(claim) => claim,
                ClaimResult::Busy | ClaimResult::Resolved | ClaimResult::Missing => {
                    summary.skipped += 1;
                    continue;
                }
            };

            let guard = ClaimGuard::new(self, id);
            self.emit(CollectionEvent::ProcessingStarted { id });
            let (mime_type, outcome) = self.process(&claim).await;
            guard.disarm();
            match &outcome {
                Outcome::Captioned(_) => summary.succeeded += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
            self.finish(id, mime_type, outcome)?;
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            duration_ms = summary.duration_ms,
            "batch completed"
        );
        self.emit(CollectionEvent::BatchCompleted {
            summary: summary.clone(),
        });
        Ok(summary)
    }

    /// CSV of every captioned record.
    pub fn export_csv(&self) -> Result<String> {
        self.begin_intent();
        self.report(export::export_csv(&self.collection.snapshot()))
    }

    // -- Pipeline --

    /// Encode then caption. Never fails: errors become [`Outcome::Failed`].
    async fn process(&self, claim: &Claim) -> (Option<String>, Outcome) {
        let encoded =
            match encoder::encode(&self.fetcher, &claim.source, claim.mime_type.as_deref()).await {
                Ok(encoded) => encoded,
                Err(e) => return (None, Outcome::Failed(e.to_string())),
            };

        let mime_type = Some(encoded.mime_type.clone());
        match self.captioner.caption(&encoded).await {
            Ok(text) => (mime_type, Outcome::Captioned(text)),
            Err(e) => (mime_type, Outcome::Failed(e.to_string())),
        }
    }

    fn finish(&self, id: RecordId, mime_type: Option<String>, outcome: Outcome) -> Result<()> {
        if let Outcome::Failed(error) = &outcome {
            warn!(%id, %error, "captioning failed");
        }

        if !self.collection.commit(id, mime_type, outcome.clone())? {
            debug!(%id, "record removed before its result arrived; discarding");
            return Ok(());
        }

        self.emit(match outcome {
            Outcome::Captioned(alt_text) => CollectionEvent::Captioned { id, alt_text },
            Outcome::Failed(error) => CollectionEvent::Failed { id, error },
        });
        Ok(())
    }

    // -- Notice & events --

    fn begin_intent(&self) {
        if let Ok(mut notice) = self.notice.lock() {
            *notice = None;
        }
    }

    /// Route collection-level errors to the notice; pass everything through.
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_collection_level() {
                if let Ok(mut notice) = self.notice.lock() {
                    *notice = Some(e.to_string());
                }
            }
        }
        result
    }

    fn emit(&self, event: CollectionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
