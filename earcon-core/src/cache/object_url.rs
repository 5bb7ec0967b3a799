//! Object URL handles and the registries that issue and revoke them.
//!
//! An `ObjectUrl` stands in for binary data held by the host (the way a
//! browser `blob:` URL does). It is deliberately not `Clone`: releasing one
//! consumes it, so a URL can only be released by whoever owns it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

/// URL scheme prefix for URLs issued by `InMemoryUrlRegistry`.
const URL_PREFIX: &str = "blob:earcon/";

/// An owned, disposable reference to binary resource data.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    /// Wraps a URL issued by a registry.
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Borrowed string form, e.g. for handing to an audio element.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Releases handles. Taking the handle by value is what makes a second
/// release of the same handle impossible for safe callers.
pub trait HandleDisposer<H>: Send + Sync {
    fn release(&self, handle: H);
}

/// Issues object URLs for byte buffers and revokes them on release.
pub trait ObjectUrlRegistry: HandleDisposer<ObjectUrl> {
    fn create_object_url(&self, data: Vec<u8>) -> ObjectUrl;
}

/// In-process object URL registry.
///
/// Keeps the bytes behind every live URL until the URL is released.
pub struct InMemoryUrlRegistry {
    next_id: AtomicU64,
    live: RwLock<HashMap<String, Vec<u8>>>,
    released: Mutex<u64>,
}

impl InMemoryUrlRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            live: RwLock::new(HashMap::new()),
            released: Mutex::new(0),
        }
    }

    /// Returns a copy of the bytes behind a live URL.
    pub fn resolve(&self, url: &str) -> Option<Vec<u8>> {
        self.live.read().ok()?.get(url).cloned()
    }

    /// Returns true if the URL was issued here and has not been released.
    pub fn is_live(&self, url: &str) -> bool {
        self.live
            .read()
            .map(|live| live.contains_key(url))
            .unwrap_or(false)
    }

    /// Number of URLs issued and not yet released.
    pub fn live_count(&self) -> usize {
        self.live.read().map(|live| live.len()).unwrap_or(0)
    }

    /// Number of URLs released so far.
    pub fn released_count(&self) -> u64 {
        self.released.lock().map(|n| *n).unwrap_or(0)
    }
}

impl Default for InMemoryUrlRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleDisposer<ObjectUrl> for InMemoryUrlRegistry {
    fn release(&self, handle: ObjectUrl) {
        let removed = match self.live.write() {
            Ok(mut live) => live.remove(handle.as_str()).is_some(),
            Err(_) => false,
        };

        if !removed {
            tracing::warn!("Released unknown or already revoked object URL: {}", handle);
            return;
        }

        if let Ok(mut released) = self.released.lock() {
            *released += 1;
        }
        tracing::debug!("Revoked object URL: {}", handle);
    }
}

impl ObjectUrlRegistry for InMemoryUrlRegistry {
    fn create_object_url(&self, data: Vec<u8>) -> ObjectUrl {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let url = format!("{}{}", URL_PREFIX, id);
        if let Ok(mut live) = self.live.write() {
            live.insert(url.clone(), data);
        }
        ObjectUrl::new(url)
    }
}
