//! Preference-gated playback controller with loop tracking.
//!
//! Every play goes through the same sequence: check the live audio preference,
//! resolve the sound's element (creating it on first use), then start it once
//! or in a loop. Looping sounds are recorded so a second `loop_sound` call
//! does not start a second instance, and so a switch to
//! `AudioPreference::None` can stop everything that was running before the
//! switch. Sounds that pass the gate after the switch are left alone.
//!
//! Operations on one sound id are serialized: each play/stop holds that id's
//! async lock from the gate check until playback has started or paused.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

use crate::audio::{
    AudioBackend, AudioElement, AudioPreference, CachedSourceResolver, ResourceProvider,
    SoundCatalog, SourceResolver, StaticSourceResolver,
};
use crate::cache::ObjectUrlRegistry;
use crate::config::{AudioConfig, SoundEntry};
use crate::error::{Error, Result};

type ElementMap = HashMap<String, Arc<dyn AudioElement>>;

/// What a play request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// One-shot playback started.
    Started,
    /// Looping playback started.
    Looping,
    /// The sound was already looping; nothing new was started.
    AlreadyLooping,
    /// The current preference excludes this sound.
    Ignored,
}

/// Play/stop requests pushed by other parts of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCommand {
    Play(String),
    Loop(String),
    Stop(String),
}

/// Plays catalog sounds subject to the user's audio preference.
pub struct PlaybackController {
    catalog: SoundCatalog,
    resolver: Arc<dyn SourceResolver>,
    backend: Arc<dyn AudioBackend>,
    preference: watch::Receiver<AudioPreference>,
    elements: Mutex<ElementMap>,
    /// Sounds started with `loop_sound` and not yet stopped.
    currently_looping: Mutex<ElementMap>,
    /// Preference each started sound passed the gate under.
    started_under: Mutex<HashMap<String, AudioPreference>>,
    sound_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    preference_task: Mutex<Option<JoinHandle<()>>>,
    command_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PlaybackController {
    /// Creates a controller. The preference receiver is read on every play;
    /// its sender stays with whoever owns the user's settings.
    pub fn new(
        catalog: SoundCatalog,
        resolver: Arc<dyn SourceResolver>,
        backend: Arc<dyn AudioBackend>,
        preference: watch::Receiver<AudioPreference>,
    ) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            resolver,
            backend,
            preference,
            elements: Mutex::new(HashMap::new()),
            currently_looping: Mutex::new(HashMap::new()),
            started_under: Mutex::new(HashMap::new()),
            sound_locks: Mutex::new(HashMap::new()),
            preference_task: Mutex::new(None),
            command_tasks: Mutex::new(Vec::new()),
        })
    }

    /// Creates a controller that binds elements straight to `<audio_path>/<file>`.
    pub fn from_config(
        config: &AudioConfig,
        backend: Arc<dyn AudioBackend>,
        preference: watch::Receiver<AudioPreference>,
    ) -> Arc<Self> {
        Self::new(
            SoundCatalog::from_config(config),
            Arc::new(StaticSourceResolver::new(config.audio_path.clone())),
            backend,
            preference,
        )
    }

    /// Creates a controller that binds elements to cached object URLs,
    /// keeping at most `config.cache_capacity` of them alive.
    pub fn with_object_url_cache<R>(
        config: &AudioConfig,
        provider: Arc<dyn ResourceProvider>,
        registry: Arc<R>,
        backend: Arc<dyn AudioBackend>,
        preference: watch::Receiver<AudioPreference>,
    ) -> Result<Arc<Self>>
    where
        R: ObjectUrlRegistry + 'static,
    {
        let capacity = NonZeroUsize::new(config.cache_capacity).ok_or_else(|| {
            Error::ConfigValidation(
                "cache_capacity".to_string(),
                "Cache capacity must be positive".to_string(),
            )
        })?;
        let resolver =
            CachedSourceResolver::new(config.audio_path.clone(), capacity, provider, registry);

        Ok(Self::new(
            SoundCatalog::from_config(config),
            Arc::new(resolver),
            backend,
            preference,
        ))
    }

    /// Subscribes to preference changes and, with `preload`, resolves and
    /// preloads every catalog sound. Preload is best-effort: failures are
    /// logged and the remaining sounds are still preloaded.
    pub async fn init(self: &Arc<Self>, preload: bool) -> Result<()> {
        self.subscribe_to_preference()?;

        if preload {
            self.preload_all().await;
        }

        tracing::info!(
            "Playback controller ready: {} sounds, {} backend, preload {}, preference {}",
            self.catalog.len(),
            self.backend.name(),
            preload,
            self.preference()
        );
        Ok(())
    }

    /// Plays a sound once.
    pub async fn play(&self, id: &str) -> Result<PlayOutcome> {
        self.play_with_loop(id, false).await
    }

    /// Plays a sound in a loop until it is stopped. Does nothing if the sound
    /// is already looping.
    pub async fn loop_sound(&self, id: &str) -> Result<PlayOutcome> {
        self.play_with_loop(id, true).await
    }

    /// Plays a sound, once or looping.
    ///
    /// A sound excluded by the current preference is skipped with
    /// `PlayOutcome::Ignored`. Resolution and playback failures are logged and
    /// returned.
    pub async fn play_with_loop(&self, id: &str, looping: bool) -> Result<PlayOutcome> {
        match self.start_sound(id, looping).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_ignored_sound() => {
                tracing::debug!(sound = id, "Ignoring sound under preference '{}'", self.preference());
                Ok(PlayOutcome::Ignored)
            }
            Err(e) => {
                tracing::error!(sound = id, "Failed playing sound: {}", e);
                Err(e)
            }
        }
    }

    /// Stops a sound and clears its loop flag. A sound that was never started
    /// is left alone.
    pub async fn stop(&self, id: &str) -> Result<()> {
        self.stop_sound(id).await.map_err(|e| {
            tracing::error!(sound = id, "Failed stopping sound: {}", e);
            e
        })
    }

    /// Stops every playing or looping sound, one at a time. A failing stop does
    /// not prevent the others. Returns the number of sounds stopped.
    pub async fn stop_all(&self) -> usize {
        self.stop_where(|_| true).await
    }

    /// Stops the sounds that were started before the preference switched to
    /// `None`. Anything that passed the gate under `None` keeps playing.
    async fn stop_started_before_mute(&self) -> usize {
        self.stop_where(|started_under| started_under != Some(AudioPreference::None))
            .await
    }

    /// Stops every active sound whose start preference matches `select`, in
    /// sorted id order. Each check runs under the sound's lock, so a play in
    /// flight finishes and records its gate before it is looked at.
    async fn stop_where(&self, select: impl Fn(Option<AudioPreference>) -> bool) -> usize {
        let mut stopped = 0;
        let mut failed = 0;

        for id in self.catalog.ids() {
            let _guard = self.lock_sound(id).await;
            if !self.is_active(id) || !select(self.started_under(id)) {
                continue;
            }

            match self.stop_locked(id).await {
                Ok(()) => stopped += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(sound = id, "Stop-all continuing past failure: {}", e);
                }
            }
        }

        tracing::info!("Stopped {} sounds ({} failed)", stopped, failed);
        stopped
    }

    /// Runs one command from the command channel.
    pub async fn handle_command(&self, command: AudioCommand) -> Result<()> {
        match command {
            AudioCommand::Play(id) => self.play(&id).await.map(|_| ()),
            AudioCommand::Loop(id) => self.loop_sound(&id).await.map(|_| ()),
            AudioCommand::Stop(id) => self.stop(&id).await,
        }
    }

    /// Handles commands from `commands` until the channel closes or the
    /// controller is dropped.
    pub fn subscribe_to_commands(self: &Arc<Self>, mut commands: mpsc::Receiver<AudioCommand>) {
        let controller = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            while let Some(command) = commands.recv().await {
                let Some(controller) = controller.upgrade() else {
                    break;
                };
                // Operations log their own failures.
                let _ = controller.handle_command(command).await;
            }
            tracing::debug!("Audio command subscription ended");
        });

        if let Ok(mut tasks) = self.command_tasks.lock() {
            tasks.push(task);
        }
    }

    /// The preference as of now.
    pub fn preference(&self) -> AudioPreference {
        *self.preference.borrow()
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    pub fn is_looping(&self, id: &str) -> bool {
        self.currently_looping
            .lock()
            .map(|looping| looping.contains_key(id))
            .unwrap_or(false)
    }

    /// Ids of looping sounds, sorted.
    pub fn looping_sounds(&self) -> Vec<String> {
        let mut ids: Vec<String> = match self.currently_looping.lock() {
            Ok(looping) => looping.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        ids.sort();
        ids
    }

    /// True if the sound has an element and it is not paused.
    pub fn is_playing(&self, id: &str) -> bool {
        self.existing_element(id)
            .map_or(false, |element| !element.is_paused())
    }

    /// True once the sound's element has been created.
    pub fn has_element(&self, id: &str) -> bool {
        self.existing_element(id).is_some()
    }

    async fn start_sound(&self, id: &str, looping: bool) -> Result<PlayOutcome> {
        let entry = self.catalog.entry(id)?;
        let _guard = self.lock_sound(id).await;

        let preference = self.check_sound_setting(entry)?;

        if looping && self.is_looping(id) {
            tracing::debug!(sound = id, "Sound already looping");
            return Ok(PlayOutcome::AlreadyLooping);
        }

        let element = self.element_for(entry).await?;
        element.play(looping).await.map_err(|e| e.into_playback(id))?;

        {
            let mut currently_looping = self.currently_looping.lock().map_err(|_| Error::CacheLock)?;
            if looping {
                currently_looping.insert(id.to_string(), Arc::clone(&element));
            } else if currently_looping.remove(id).is_some() {
                tracing::debug!(sound = id, "Loop replaced by one-shot playback");
            }
        }
        if let Ok(mut started_under) = self.started_under.lock() {
            started_under.insert(id.to_string(), preference);
        }

        tracing::info!(sound = id, "Playing sound (loop: {})", looping);
        Ok(if looping {
            PlayOutcome::Looping
        } else {
            PlayOutcome::Started
        })
    }

    async fn stop_sound(&self, id: &str) -> Result<()> {
        self.catalog.entry(id)?;
        let _guard = self.lock_sound(id).await;
        self.stop_locked(id).await
    }

    /// Caller holds the sound's lock.
    async fn stop_locked(&self, id: &str) -> Result<()> {
        let Some(element) = self.existing_element(id) else {
            return Ok(());
        };

        let paused = if element.is_paused() {
            Ok(())
        } else {
            tracing::info!(sound = id, "Stopping sound");
            element.pause().await.map_err(|e| e.into_playback(id))
        };

        // Cleared even when pausing failed.
        let was_looping = self
            .currently_looping
            .lock()
            .map_err(|_| Error::CacheLock)?
            .remove(id)
            .is_some();
        if was_looping {
            tracing::debug!(sound = id, "Cleared loop flag");
        }
        if let Ok(mut started_under) = self.started_under.lock() {
            started_under.remove(id);
        }

        paused
    }

    /// Returns the preference the sound was let through under.
    fn check_sound_setting(&self, entry: &SoundEntry) -> Result<AudioPreference> {
        let preference = self.preference();
        if preference.permits(entry.class) {
            Ok(preference)
        } else {
            Err(Error::IgnoredSound(entry.id.clone()))
        }
    }

    /// Returns the sound's element, resolving its source and creating it on
    /// first use.
    async fn element_for(&self, entry: &SoundEntry) -> Result<Arc<dyn AudioElement>> {
        if let Some(element) = self.existing_element(&entry.id) {
            return Ok(element);
        }

        let source = self
            .resolver
            .resolve(entry)
            .await
            .map_err(|e| e.into_resolution(&entry.id))?;
        let element = self
            .backend
            .create_element(&source)
            .await
            .map_err(|e| e.into_resolution(&entry.id))?;
        tracing::debug!(
            sound = %entry.id,
            "Created {} element for {}",
            self.backend.name(),
            source.location
        );

        let mut elements = self.elements.lock().map_err(|_| Error::CacheLock)?;
        Ok(Arc::clone(elements.entry(entry.id.clone()).or_insert(element)))
    }

    fn existing_element(&self, id: &str) -> Option<Arc<dyn AudioElement>> {
        self.elements.lock().ok()?.get(id).cloned()
    }

    /// Looping, or holding an element that is not paused.
    fn is_active(&self, id: &str) -> bool {
        self.is_looping(id) || self.is_playing(id)
    }

    fn started_under(&self, id: &str) -> Option<AudioPreference> {
        self.started_under.lock().ok()?.get(id).copied()
    }

    async fn lock_sound(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .sound_locks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    async fn preload_all(&self) {
        let ids: Vec<&str> = self.catalog.ids().collect();
        let results =
            futures::future::join_all(ids.iter().map(|id| self.preload_sound(id))).await;

        let mut failed = 0;
        for (id, result) in ids.iter().zip(results) {
            if let Err(e) = result {
                failed += 1;
                tracing::warn!(sound = *id, "Failed to preload sound: {}", e);
            }
        }

        tracing::info!("Preloaded {} of {} sounds", ids.len() - failed, ids.len());
    }

    async fn preload_sound(&self, id: &str) -> Result<()> {
        let entry = self.catalog.entry(id)?;
        let _guard = self.lock_sound(id).await;

        let element = self.element_for(entry).await?;
        element.preload().await.map_err(|e| e.into_playback(id))
    }

    fn subscribe_to_preference(self: &Arc<Self>) -> Result<()> {
        let mut task = self.preference_task.lock().map_err(|_| Error::CacheLock)?;
        if task.is_some() {
            return Ok(());
        }

        let mut preference = self.preference.clone();
        preference.borrow_and_update();
        let controller = Arc::downgrade(self);
        *task = Some(tokio::spawn(watch_preference(controller, preference)));
        Ok(())
    }
}

/// Stops the sounds started before each switch to `None`.
async fn watch_preference(
    controller: Weak<PlaybackController>,
    mut preference: watch::Receiver<AudioPreference>,
) {
    while preference.changed().await.is_ok() {
        let current = *preference.borrow_and_update();
        let Some(controller) = controller.upgrade() else {
            break;
        };

        tracing::info!("Audio preference changed to '{}'", current);
        if current == AudioPreference::None {
            controller.stop_started_before_mute().await;
        }
    }
    tracing::debug!("Audio preference subscription ended");
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Ok(mut task) = self.preference_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
        if let Ok(mut tasks) = self.command_tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}
