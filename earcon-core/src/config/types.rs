//! Configuration types for the sound catalog and playback settings.

use serde::{Deserialize, Serialize};

use crate::audio::{AudioPreference, PlaybackRequestClass};

/// Directory all sound files are served from unless configured otherwise.
pub const DEFAULT_AUDIO_PATH: &str = "/audio";

/// Number of object URLs kept alive by default.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Complete audio configuration loaded from YAML or JSON.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AudioConfig {
    /// Base path sound files are resolved against.
    #[serde(default = "default_audio_path")]
    pub audio_path: String,
    /// Maximum number of cached object URLs.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Resolve and preload every sound at init.
    #[serde(default)]
    pub preload: bool,
    /// Preference in effect before the user changes it.
    #[serde(default)]
    pub preference: AudioPreference,
    #[serde(default = "default_sounds")]
    pub sounds: Vec<SoundEntry>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            audio_path: default_audio_path(),
            cache_capacity: default_cache_capacity(),
            preload: false,
            preference: AudioPreference::default(),
            sounds: default_sounds(),
        }
    }
}

impl AudioConfig {
    /// Looks up a sound entry by id.
    pub fn sound(&self, id: &str) -> Option<&SoundEntry> {
        self.sounds.iter().find(|s| s.id == id)
    }
}

/// One sound in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SoundEntry {
    pub id: String,
    /// File name under `audio_path`. Defaults to `<id>.mp3`.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub class: PlaybackRequestClass,
}

impl SoundEntry {
    pub fn new(id: impl Into<String>, class: PlaybackRequestClass) -> Self {
        Self {
            id: id.into(),
            file: None,
            class,
        }
    }

    /// File name of this sound, falling back to `<id>.mp3`.
    pub fn file_name(&self) -> String {
        match self.file {
            Some(ref file) => file.clone(),
            None => format!("{}.mp3", self.id),
        }
    }

    /// Full source path of this sound under `audio_path`.
    pub fn source_path(&self, audio_path: &str) -> String {
        format!("{}/{}", audio_path.trim_end_matches('/'), self.file_name())
    }
}

fn default_audio_path() -> String {
    DEFAULT_AUDIO_PATH.to_string()
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// Built-in notification sound catalog.
pub fn default_sounds() -> Vec<SoundEntry> {
    use PlaybackRequestClass::{AlwaysAudible, Important, Regular};

    [
        ("alert", Regular),
        ("call_drop", Important),
        ("incoming_call", AlwaysAudible),
        ("network_interruption", Important),
        ("new_message", Regular),
        ("outgoing_call", AlwaysAudible),
        ("outgoing_ping", Regular),
        ("ping_from_me", Regular),
        ("ping_from_them", Important),
        ("ready_to_talk", Important),
        ("talk_later", Important),
    ]
    .into_iter()
    .map(|(id, class)| SoundEntry::new(id, class))
    .collect()
}
