//! Configuration loading and validation for the sound catalog.

mod loader;
mod types;
mod validator;

pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILE};
pub use types::*;
pub use validator::ConfigValidator;
