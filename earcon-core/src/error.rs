//! Error types for earcon-core.

use thiserror::Error;

/// Main error type for the earcon-core library.
#[derive(Error, Debug)]
pub enum Error {
    // Config errors
    #[error("Failed to load config '{0}': {1}")]
    ConfigLoad(String, String),

    #[error("Failed to parse config '{0}': {1}")]
    ConfigParse(String, String),

    #[error("Config validation error in '{0}': {1}")]
    ConfigValidation(String, String),

    #[error("Failed to acquire cache lock")]
    CacheLock,

    // Playback errors
    /// The current audio preference excludes this sound. Never surfaced by
    /// `PlaybackController::play`.
    #[error("Sound '{0}' ignored by current audio preference")]
    IgnoredSound(String),

    #[error("Failed to resolve sound '{0}': {1}")]
    SoundResolution(String, String),

    #[error("Failed to play sound '{0}': {1}")]
    SoundPlayback(String, String),

    #[error("Audio backend unavailable: {0}")]
    AudioBackend(String),

    // Resource errors
    #[error("Failed to fetch resource '{0}': {1}")]
    ResourceFetch(String, String),

    // Generic errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns true for the preference gate rejection.
    pub fn is_ignored_sound(&self) -> bool {
        matches!(self, Error::IgnoredSound(_))
    }

    /// Wraps any error raised while resolving `sound` as a resolution failure.
    pub(crate) fn into_resolution(self, sound: &str) -> Error {
        match self {
            e @ Error::SoundResolution(..) => e,
            other => Error::SoundResolution(sound.to_string(), other.to_string()),
        }
    }

    /// Wraps any error raised while starting or pausing `sound` as a playback failure.
    pub(crate) fn into_playback(self, sound: &str) -> Error {
        match self {
            e @ Error::SoundPlayback(..) => e,
            other => Error::SoundPlayback(sound.to_string(), other.to_string()),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
