//! Audio elements and the backends that create them.
//!
//! An element is one playable sound bound to a source, the way an HTML audio
//! element is bound to its `src`. The controller keeps one element per sound
//! id and reuses it for every play.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::audio::SoundSource;
use crate::error::Result;

/// A playable sound bound to one source.
#[async_trait]
pub trait AudioElement: Send + Sync {
    /// Loads the source ahead of the first play.
    async fn preload(&self) -> Result<()>;

    /// Starts playback from the beginning, repeating until paused if `looping`.
    async fn play(&self, looping: bool) -> Result<()>;

    /// Pauses playback.
    async fn pause(&self) -> Result<()>;

    /// True unless the element is currently playing.
    fn is_paused(&self) -> bool;
}

/// Creates audio elements for resolved sources.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn create_element(&self, source: &SoundSource) -> Result<Arc<dyn AudioElement>>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Backend that produces no sound and only tracks element state.
///
/// Used when no output device is available.
#[derive(Debug, Default)]
pub struct SilentBackend;

impl SilentBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioBackend for SilentBackend {
    async fn create_element(&self, source: &SoundSource) -> Result<Arc<dyn AudioElement>> {
        Ok(Arc::new(SilentElement::new(&source.location)))
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

/// Element of `SilentBackend`.
#[derive(Debug)]
pub struct SilentElement {
    location: String,
    paused: AtomicBool,
    looping: AtomicBool,
    preloaded: AtomicBool,
    play_count: AtomicU32,
}

impl SilentElement {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            paused: AtomicBool::new(true),
            looping: AtomicBool::new(false),
            preloaded: AtomicBool::new(false),
            play_count: AtomicU32::new(0),
        }
    }

    pub fn is_looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    pub fn is_preloaded(&self) -> bool {
        self.preloaded.load(Ordering::SeqCst)
    }

    pub fn play_count(&self) -> u32 {
        self.play_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioElement for SilentElement {
    async fn preload(&self) -> Result<()> {
        self.preloaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn play(&self, looping: bool) -> Result<()> {
        tracing::debug!("Silent playback of {} (loop: {})", self.location, looping);
        self.looping.store(looping, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.play_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}
