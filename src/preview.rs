//! Temporary preview references for uploaded images.
//!
//! Uploads are displayed without re-reading their bytes through a handle
//! minted at intake. Handles have a manual lifetime: whoever discards the
//! record must release its handle, and each handle is released exactly once.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

const HANDLE_SCHEME: &str = "blob:alt-text/";

/// A displayable reference to an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Default)]
struct RegistryState {
    live: HashSet<String>,
    minted: usize,
    released: usize,
}

/// Mints and releases preview handles, tracking which are still live.
#[derive(Default)]
pub struct PreviewRegistry {
    state: Mutex<RegistryState>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh handle for an upload.
    pub fn mint(&self) -> PreviewHandle {
        let handle = format!("{}{}", HANDLE_SCHEME, uuid::Uuid::new_v4());
        match self.state.lock() {
            Ok(mut state) => {
                state.live.insert(handle.clone());
                state.minted += 1;
            }
            Err(e) => warn!("preview registry mutex poisoned: {}", e),
        }
        PreviewHandle(handle)
    }

    /// Release a handle. Returns `false` if it was not live (unknown or
    /// already released).
    pub fn release(&self, handle: &PreviewHandle) -> bool {
        match self.state.lock() {
            Ok(mut state) => {
                if state.live.remove(&handle.0) {
                    state.released += 1;
                    true
                } else {
                    warn!(handle = %handle, "preview handle released twice or never minted");
                    false
                }
            }
            Err(e) => {
                warn!("preview registry mutex poisoned: {}", e);
                false
            }
        }
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.state
            .lock()
            .map(|state| state.live.contains(&handle.0))
            .unwrap_or(false)
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().map(|s| s.live.len()).unwrap_or(0)
    }

    pub fn minted_count(&self) -> usize {
        self.state.lock().map(|s| s.minted).unwrap_or(0)
    }

    pub fn released_count(&self) -> usize {
        self.state.lock().map(|s| s.released).unwrap_or(0)
    }
}
