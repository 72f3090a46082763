#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alt_text_batch::*;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

type Reply = std::result::Result<String, u16>;

/// Captioner that answers from a script keyed by the decoded image bytes.
///
/// Unscripted images get `"Alt for <content>"`. Scripted errors are API
/// errors with the given status.
#[derive(Default)]
pub struct FakeCaptioner {
    script: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate: Option<Arc<tokio::sync::Notify>>,
}

impl FakeCaptioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call waits for one `notify_one` on the returned handle.
    pub fn gated() -> (Self, Arc<tokio::sync::Notify>) {
        let gate = Arc::new(tokio::sync::Notify::new());
        let captioner = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (captioner, gate)
    }

    pub fn succeed(self, content: &str, alt: &str) -> Self {
        self.push(content, Ok(alt.to_string()))
    }

    pub fn fail(self, content: &str, status: u16) -> Self {
        self.push(content, Err(status))
    }

    fn push(self, content: &str, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(content.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Captioner for FakeCaptioner {
    async fn caption(&self, image: &EncodedImage) -> alt_text_batch::Result<String> {
        let bytes = STANDARD
            .decode(&image.data)
            .map_err(|e| AltTextError::InvalidResponse(e.to_string()))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        self.calls.lock().unwrap().push(content.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        tokio::task::yield_now().await;

        let reply = self
            .script
            .lock()
            .unwrap()
            .get_mut(&content)
            .and_then(|q| q.pop_front());
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Some(Ok(alt)) => Ok(alt),
            Some(Err(status)) => Err(AltTextError::ApiError {
                status,
                message: format!("scripted failure for {}", content),
            }),
            None => Ok(format!("Alt for {}", content)),
        }
    }
}

/// Fetcher serving bodies from a map; unknown URLs return HTTP 404.
#[derive(Default)]
pub struct FakeFetcher {
    pages: HashMap<String, (Option<String>, Vec<u8>)>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, content_type: Option<&str>, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            (content_type.map(str::to_string), body.as_bytes().to_vec()),
        );
        self
    }
}

impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> alt_text_batch::Result<FetchedImage> {
        match self.pages.get(url) {
            Some((content_type, body)) => Ok(FetchedImage {
                content_type: content_type.clone(),
                bytes: body.clone(),
            }),
            None => Err(AltTextError::FetchFailed {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            }),
        }
    }
}

/// An upload whose bytes are its own file name, so fakes can tell images apart.
pub fn upload(name: &str) -> FileUpload {
    let content_type = if name.ends_with(".png") {
        "image/png"
    } else if name.ends_with(".txt") {
        "text/plain"
    } else {
        "image/jpeg"
    };
    FileUpload::new(name, content_type, name.as_bytes().to_vec())
}

pub type TestOrchestrator = Orchestrator<Arc<FakeCaptioner>, FakeFetcher>;

pub fn orchestrator(captioner: FakeCaptioner) -> (TestOrchestrator, Arc<FakeCaptioner>) {
    orchestrator_with(captioner, FakeFetcher::new())
}

pub fn orchestrator_with(
    captioner: FakeCaptioner,
    fetcher: FakeFetcher,
) -> (TestOrchestrator, Arc<FakeCaptioner>) {
    let captioner = Arc::new(captioner);
    (Orchestrator::new(captioner.clone(), fetcher), captioner)
}
