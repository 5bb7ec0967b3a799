//! The set of sounds the controller knows about.

use std::collections::BTreeMap;

use crate::audio::PlaybackRequestClass;
use crate::config::{AudioConfig, SoundEntry};
use crate::error::{Error, Result};

/// Known sounds keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SoundCatalog {
    sounds: BTreeMap<String, SoundEntry>,
}

impl SoundCatalog {
    /// Builds a catalog; a later entry with the same id replaces an earlier one.
    pub fn new(entries: impl IntoIterator<Item = SoundEntry>) -> Self {
        Self {
            sounds: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    pub fn from_config(config: &AudioConfig) -> Self {
        Self::new(config.sounds.iter().cloned())
    }

    pub fn get(&self, id: &str) -> Option<&SoundEntry> {
        self.sounds.get(id)
    }

    /// Looks up a sound, failing with a resolution error for unknown ids.
    pub fn entry(&self, id: &str) -> Result<&SoundEntry> {
        self.sounds.get(id).ok_or_else(|| {
            Error::SoundResolution(id.to_string(), "Not in sound catalog".to_string())
        })
    }

    pub fn class_of(&self, id: &str) -> Option<PlaybackRequestClass> {
        self.sounds.get(id).map(|e| e.class)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sounds.contains_key(id)
    }

    /// Sound ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sounds.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}
