//! Resolving catalog entries to playable sources.
//!
//! `StaticSourceResolver` points elements straight at `<audio_path>/<file>`.
//! `CachedSourceResolver` fetches the bytes once through a `ResourceProvider`,
//! wraps them in an object URL and keeps that URL in a `HandleCache`, so at
//! most `capacity` URLs are alive and every evicted one is revoked.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::cache::{HandleCache, ObjectUrl, ObjectUrlRegistry};
use crate::config::SoundEntry;
use crate::error::{Error, Result};

/// Where an element should load a sound from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundSource {
    pub id: String,
    /// Static path or object URL.
    pub location: String,
}

impl SoundSource {
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
        }
    }
}

/// Turns a catalog entry into a source an `AudioBackend` can bind.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn resolve(&self, sound: &SoundEntry) -> Result<SoundSource>;
}

/// Resolves sounds to `<audio_path>/<file>`.
#[derive(Debug, Clone)]
pub struct StaticSourceResolver {
    audio_path: String,
}

impl StaticSourceResolver {
    pub fn new(audio_path: impl Into<String>) -> Self {
        Self {
            audio_path: audio_path.into(),
        }
    }
}

#[async_trait]
impl SourceResolver for StaticSourceResolver {
    async fn resolve(&self, sound: &SoundEntry) -> Result<SoundSource> {
        Ok(SoundSource::new(
            sound.id.clone(),
            sound.source_path(&self.audio_path),
        ))
    }
}

/// Supplies the raw bytes behind a source path.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// Serves resources from a path → bytes map.
#[derive(Debug, Default)]
pub struct InMemoryResourceProvider {
    resources: RwLock<HashMap<String, Vec<u8>>>,
    fetches: AtomicUsize,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, data: Vec<u8>) {
        if let Ok(mut resources) = self.resources.write() {
            resources.insert(path.into(), data);
        }
    }

    /// Number of `fetch` calls served so far, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceProvider for InMemoryResourceProvider {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let resources = self.resources.read().map_err(|_| Error::CacheLock)?;
        resources
            .get(path)
            .cloned()
            .ok_or_else(|| Error::ResourceFetch(path.to_string(), "Not found".to_string()))
    }
}

/// Reads resources from files under a root directory.
#[derive(Debug, Clone)]
pub struct FileResourceProvider {
    root: PathBuf,
}

impl FileResourceProvider {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Maps a source path onto the root; leading slashes are ignored.
    fn resolve_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ResourceProvider for FileResourceProvider {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);
        tokio::fs::read(&full_path)
            .await
            .map_err(|e| Error::ResourceFetch(full_path.display().to_string(), e.to_string()))
    }
}

/// Resolves sounds to object URLs kept in a bounded handle cache.
pub struct CachedSourceResolver {
    audio_path: String,
    provider: Arc<dyn ResourceProvider>,
    registry: Arc<dyn ObjectUrlRegistry>,
    cache: Mutex<HandleCache<String, ObjectUrl>>,
}

impl CachedSourceResolver {
    pub fn new<R>(
        audio_path: impl Into<String>,
        capacity: NonZeroUsize,
        provider: Arc<dyn ResourceProvider>,
        registry: Arc<R>,
    ) -> Self
    where
        R: ObjectUrlRegistry + 'static,
    {
        let cache = HandleCache::new(capacity, registry.clone());
        Self {
            audio_path: audio_path.into(),
            provider,
            registry,
            cache: Mutex::new(cache),
        }
    }

    /// Number of object URLs currently cached.
    pub fn cached_count(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Revokes every cached object URL.
    pub fn clear(&self) -> Result<usize> {
        let mut cache = self.cache.lock().map_err(|_| Error::CacheLock)?;
        Ok(cache.clear())
    }

    fn cached_location(&self, id: &str) -> Result<Option<String>> {
        let mut cache = self.cache.lock().map_err(|_| Error::CacheLock)?;
        Ok(cache.get(&id.to_string()).map(|url| url.as_str().to_string()))
    }
}

#[async_trait]
impl SourceResolver for CachedSourceResolver {
    async fn resolve(&self, sound: &SoundEntry) -> Result<SoundSource> {
        if let Some(location) = self.cached_location(&sound.id)? {
            tracing::debug!(sound = %sound.id, "Object URL cache hit: {}", location);
            return Ok(SoundSource::new(sound.id.clone(), location));
        }

        let path = sound.source_path(&self.audio_path);
        let data = self.provider.fetch(&path).await?;
        let size = data.len();
        let url = self.registry.create_object_url(data);

        let mut cache = self.cache.lock().map_err(|_| Error::CacheLock)?;
        let location = cache.set(sound.id.clone(), url).as_str().to_string();
        tracing::debug!(sound = %sound.id, "Cached object URL {} for {} ({} bytes)", location, path, size);

        Ok(SoundSource::new(sound.id.clone(), location))
    }
}
