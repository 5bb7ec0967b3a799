//! Earcon Core - notification sound playback for messaging and calling apps.
//!
//! This library provides:
//! - A bounded identifier → handle cache that releases every handle it drops
//! - Object URL registries for in-memory sound data
//! - A preference-gated playback controller with loop tracking
//! - Configuration loading and validation for the sound catalog
//! - Tracing setup with an in-memory log buffer
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use earcon_core::prelude::*;
//!
//! # async fn run() -> earcon_core::Result<()> {
//! let config = ConfigLoader::new("config").load_default()?;
//! let (preference, preference_rx) = tokio::sync::watch::channel(config.preference);
//!
//! let controller =
//!     PlaybackController::from_config(&config, Arc::new(SilentBackend::new()), preference_rx);
//! controller.init(config.preload).await?;
//!
//! controller.loop_sound("incoming_call").await?;
//! controller.stop("incoming_call").await?;
//!
//! // Mutes everything except always-audible sounds and stops running loops.
//! preference.send_replace(AudioPreference::None);
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;

#[cfg(test)]
mod testutil;

pub use error::{Error, Result};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::audio::{
        AudioBackend, AudioCommand, AudioElement, AudioPreference, PlayOutcome,
        PlaybackController, PlaybackRequestClass, SilentBackend, SoundCatalog,
    };
    pub use crate::cache::{HandleCache, HandleDisposer, ObjectUrl, ObjectUrlRegistry};
    pub use crate::config::{AudioConfig, ConfigLoader, SoundEntry};
    pub use crate::error::{Error, Result};
}
