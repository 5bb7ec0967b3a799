//! Configuration validation.

use std::collections::HashSet;

use crate::config::types::{AudioConfig, SoundEntry};
use crate::error::{Error, Result};

/// Validator for audio configurations.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new validator.
    pub fn new() -> Self {
        Self
    }

    /// Validates an audio configuration.
    pub fn validate(&self, config: &AudioConfig) -> Result<()> {
        self.validate_audio_path(config)?;
        self.validate_cache_capacity(config)?;

        let mut seen = HashSet::new();
        for sound in &config.sounds {
            self.validate_sound(sound)?;
            if !seen.insert(sound.id.as_str()) {
                return Err(Error::ConfigValidation(
                    format!("sounds.{}", sound.id),
                    "Duplicate sound id".to_string(),
                ));
            }
        }

        Ok(())
    }

    fn validate_audio_path(&self, config: &AudioConfig) -> Result<()> {
        if config.audio_path.trim().is_empty() {
            return Err(Error::ConfigValidation(
                "audio_path".to_string(),
                "Audio path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_cache_capacity(&self, config: &AudioConfig) -> Result<()> {
        if config.cache_capacity == 0 {
            return Err(Error::ConfigValidation(
                "cache_capacity".to_string(),
                "Cache capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_sound(&self, sound: &SoundEntry) -> Result<()> {
        if sound.id.trim().is_empty() {
            return Err(Error::ConfigValidation(
                "sounds".to_string(),
                "Sound id cannot be empty".to_string(),
            ));
        }

        if let Some(ref file) = sound.file {
            if file.trim().is_empty() {
                return Err(Error::ConfigValidation(
                    format!("sounds.{}.file", sound.id),
                    "File cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::PlaybackRequestClass;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::new().validate(&AudioConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = AudioConfig {
            cache_capacity: 0,
            ..AudioConfig::default()
        };
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation(ref field, _) if field == "cache_capacity"));
    }

    #[test]
    fn test_empty_audio_path_rejected() {
        let config = AudioConfig {
            audio_path: "  ".to_string(),
            ..AudioConfig::default()
        };
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let config = AudioConfig {
            sounds: vec![
                SoundEntry::new("alert", PlaybackRequestClass::Regular),
                SoundEntry::new("alert", PlaybackRequestClass::Important),
            ],
            ..AudioConfig::default()
        };
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation(ref field, _) if field == "sounds.alert"));
    }

    #[test]
    fn test_empty_file_rejected() {
        let mut sound = SoundEntry::new("alert", PlaybackRequestClass::Regular);
        sound.file = Some(String::new());
        let config = AudioConfig {
            sounds: vec![sound],
            ..AudioConfig::default()
        };
        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
