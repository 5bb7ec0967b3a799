//! Audio output through kira.
//!
//! All elements share one `AudioManager`. Static paths are read from files
//! under the backend's root; `blob:` object URLs are decoded from the bytes
//! held by an `InMemoryUrlRegistry`.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::sound::PlaybackState;
use kira::{AudioManager, AudioManagerSettings, DefaultBackend, Tween};

use crate::audio::{AudioBackend, AudioElement, SoundSource};
use crate::cache::InMemoryUrlRegistry;
use crate::error::{Error, Result};

type SharedManager = Arc<Mutex<AudioManager<DefaultBackend>>>;

/// Backend that plays sounds on the default output device.
pub struct KiraBackend {
    root: PathBuf,
    manager: SharedManager,
    urls: Option<Arc<InMemoryUrlRegistry>>,
}

impl KiraBackend {
    /// Opens the default output device. Static sound paths resolve under `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| Error::AudioBackend(e.to_string()))?;
        tracing::info!("Opened kira audio output");

        Ok(Self {
            root: root.as_ref().to_path_buf(),
            manager: Arc::new(Mutex::new(manager)),
            urls: None,
        })
    }

    /// Lets elements bind to object URLs issued by `registry`.
    pub fn with_url_registry(mut self, registry: Arc<InMemoryUrlRegistry>) -> Self {
        self.urls = Some(registry);
        self
    }

    fn origin(&self, source: &SoundSource) -> Result<SoundOrigin> {
        if !source.location.starts_with("blob:") {
            return Ok(SoundOrigin::File(
                self.root.join(source.location.trim_start_matches('/')),
            ));
        }

        let bytes = self
            .urls
            .as_ref()
            .and_then(|urls| urls.resolve(&source.location))
            .ok_or_else(|| {
                Error::SoundResolution(
                    source.id.clone(),
                    format!("Object URL {} is not live", source.location),
                )
            })?;
        Ok(SoundOrigin::Bytes(bytes))
    }
}

#[async_trait]
impl AudioBackend for KiraBackend {
    async fn create_element(&self, source: &SoundSource) -> Result<Arc<dyn AudioElement>> {
        Ok(Arc::new(KiraElement {
            sound: source.id.clone(),
            origin: self.origin(source)?,
            manager: Arc::clone(&self.manager),
            data: Mutex::new(None),
            handle: Mutex::new(None),
        }))
    }

    fn name(&self) -> &'static str {
        "kira"
    }
}

#[derive(Debug, Clone)]
enum SoundOrigin {
    File(PathBuf),
    Bytes(Vec<u8>),
}

/// One sound bound to a file or in-memory bytes.
pub struct KiraElement {
    sound: String,
    origin: SoundOrigin,
    manager: SharedManager,
    /// Decoded on first use.
    data: Mutex<Option<StaticSoundData>>,
    handle: Mutex<Option<StaticSoundHandle>>,
}

impl KiraElement {
    async fn load(&self) -> Result<StaticSoundData> {
        if let Some(data) = self.data.lock().map_err(|_| Error::CacheLock)?.clone() {
            return Ok(data);
        }

        let origin = self.origin.clone();
        let data = tokio::task::spawn_blocking(move || match origin {
            SoundOrigin::File(path) => StaticSoundData::from_file(&path)
                .map_err(|e| format!("Failed to load {}: {}", path.display(), e)),
            SoundOrigin::Bytes(bytes) => StaticSoundData::from_cursor(Cursor::new(bytes))
                .map_err(|e| format!("Failed to decode object URL data: {}", e)),
        })
        .await
        .map_err(|e| Error::AudioBackend(e.to_string()))?
        .map_err(|e| Error::SoundPlayback(self.sound.clone(), e))?;

        *self.data.lock().map_err(|_| Error::CacheLock)? = Some(data.clone());
        Ok(data)
    }
}

#[async_trait]
impl AudioElement for KiraElement {
    async fn preload(&self) -> Result<()> {
        self.load().await.map(|_| ())
    }

    async fn play(&self, looping: bool) -> Result<()> {
        let data = self.load().await?;
        let data = if looping { data.loop_region(..) } else { data };

        let handle = self
            .manager
            .lock()
            .map_err(|_| Error::CacheLock)?
            .play(data)
            .map_err(|e| Error::SoundPlayback(self.sound.clone(), format!("{:?}", e)))?;

        let mut slot = self.handle.lock().map_err(|_| Error::CacheLock)?;
        if let Some(mut previous) = slot.replace(handle) {
            previous.stop(Tween::default());
        }
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        let mut slot = self.handle.lock().map_err(|_| Error::CacheLock)?;
        if let Some(handle) = slot.as_mut() {
            handle.pause(Tween::default());
        }
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.handle
            .lock()
            .ok()
            .and_then(|slot| {
                slot.as_ref().map(|handle| {
                    !matches!(
                        handle.state(),
                        PlaybackState::Playing | PlaybackState::Resuming
                    )
                })
            })
            .unwrap_or(true)
    }
}

impl Drop for KiraElement {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.handle.lock() {
            if let Some(mut handle) = slot.take() {
                handle.stop(Tween::default());
            }
        }
    }
}
