//! Sound catalog, audio backends and the playback controller.

mod catalog;
mod controller;
mod element;
#[cfg(feature = "kira")]
mod kira_backend;
mod preference;
mod source;

pub use catalog::SoundCatalog;
pub use controller::{AudioCommand, PlayOutcome, PlaybackController};
pub use element::{AudioBackend, AudioElement, SilentBackend, SilentElement};
#[cfg(feature = "kira")]
pub use kira_backend::{KiraBackend, KiraElement};
pub use preference::{AudioPreference, PlaybackRequestClass};
pub use source::{
    CachedSourceResolver, FileResourceProvider, InMemoryResourceProvider, ResourceProvider,
    SoundSource, SourceResolver, StaticSourceResolver,
};
