//! YAML/JSON configuration loader with caching and multi-directory lookup.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::config::types::AudioConfig;
use crate::config::validator::ConfigValidator;
use crate::error::{Error, Result};

/// File name looked up by `load_default`.
pub const DEFAULT_CONFIG_FILE: &str = "earcon.yaml";

/// Configuration loader with caching.
/// Supports scanning multiple directories (e.g., built-in + user overrides).
/// When names collide, later directories override earlier ones.
pub struct ConfigLoader {
    config_dirs: Vec<PathBuf>,
    cache: Arc<RwLock<HashMap<String, AudioConfig>>>,
    validator: ConfigValidator,
}

impl ConfigLoader {
    /// Creates a new config loader for a single directory.
    pub fn new<P: AsRef<Path>>(config_dir: P) -> Self {
        Self::new_with_dirs(vec![config_dir.as_ref().to_path_buf()])
    }

    /// Creates a new config loader that scans multiple directories.
    /// Directories are scanned in order; later directories take priority.
    pub fn new_with_dirs(config_dirs: Vec<PathBuf>) -> Self {
        Self {
            config_dirs,
            cache: Arc::new(RwLock::new(HashMap::new())),
            validator: ConfigValidator::new(),
        }
    }

    /// Loads a single config by filename (searches all directories).
    pub fn load(&self, filename: &str) -> Result<AudioConfig> {
        {
            let cache = self.cache.read().map_err(|_| Error::CacheLock)?;
            if let Some(config) = cache.get(filename) {
                return Ok(config.clone());
            }
        }

        let path = self.find(filename).ok_or_else(|| {
            Error::ConfigLoad(
                filename.to_string(),
                "File not found in any config directory".to_string(),
            )
        })?;

        let config = Self::load_from_path(&path)?;
        self.validator.validate(&config)?;

        {
            let mut cache = self.cache.write().map_err(|_| Error::CacheLock)?;
            cache.insert(filename.to_string(), config.clone());
        }

        tracing::info!(
            "Loaded audio config from {:?}: {} sounds, cache capacity {}",
            path,
            config.sounds.len(),
            config.cache_capacity
        );
        Ok(config)
    }

    /// Loads `earcon.yaml`, or the built-in defaults when no directory has one.
    /// A file that exists but fails to parse or validate is still an error.
    pub fn load_default(&self) -> Result<AudioConfig> {
        if self.find(DEFAULT_CONFIG_FILE).is_none() {
            tracing::info!("No {} found, using built-in audio config", DEFAULT_CONFIG_FILE);
            return Ok(AudioConfig::default());
        }
        self.load(DEFAULT_CONFIG_FILE)
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml_str(content: &str) -> Result<AudioConfig> {
        let config: AudioConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse("<inline>".to_string(), e.to_string()))?;
        ConfigValidator::new().validate(&config)?;
        Ok(config)
    }

    /// Loads config from a specific path. The format follows the extension:
    /// `.json` is JSON, anything else is YAML.
    fn load_from_path(path: &Path) -> Result<AudioConfig> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(path.display().to_string(), e.to_string()))?;

        if is_json(path) {
            serde_json::from_str(&content)
                .map_err(|e| Error::ConfigParse(path.display().to_string(), e.to_string()))
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| Error::ConfigParse(path.display().to_string(), e.to_string()))
        }
    }

    /// Finds the highest-priority directory containing `filename`.
    fn find(&self, filename: &str) -> Option<PathBuf> {
        self.config_dirs
            .iter()
            .rev()
            .map(|dir| dir.join(filename))
            .find(|candidate| candidate.exists())
    }

    /// Discovers all config filenames across all directories, sorted.
    pub fn discover_all(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::new();

        for dir in &self.config_dirs {
            if !dir.exists() {
                continue;
            }
            let entries = fs::read_dir(dir)
                .map_err(|e| Error::ConfigLoad(dir.display().to_string(), e.to_string()))?;

            for entry in entries.flatten() {
                let path = entry.path();
                let is_config = path
                    .extension()
                    .map_or(false, |ext| ext == "yaml" || ext == "yml" || ext == "json");
                if !is_config {
                    continue;
                }
                if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
                    if !names.iter().any(|n| n == filename) {
                        names.push(filename.to_string());
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// Clears the config cache.
    pub fn clear_cache(&self) -> Result<()> {
        let mut cache = self.cache.write().map_err(|_| Error::CacheLock)?;
        cache.clear();
        Ok(())
    }

    /// Returns all config directories.
    pub fn config_dirs(&self) -> &[PathBuf] {
        &self.config_dirs
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioPreference, PlaybackRequestClass};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_config(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        let mut file = fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_load_yaml_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"
audio_path: /static/audio
cache_capacity: 8
preload: true
preference: some
sounds:
  - id: incoming_call
    class: always_audible
  - id: new_message
    file: message.ogg
"#;
        create_test_config(temp_dir.path(), "earcon.yaml", config_content);

        let loader = ConfigLoader::new(temp_dir.path());
        let config = loader.load("earcon.yaml").unwrap();

        assert_eq!(config.audio_path, "/static/audio");
        assert_eq!(config.cache_capacity, 8);
        assert!(config.preload);
        assert_eq!(config.preference, AudioPreference::Some);
        assert_eq!(config.sounds.len(), 2);
        assert_eq!(config.sounds[0].class, PlaybackRequestClass::AlwaysAudible);
        assert_eq!(config.sounds[1].class, PlaybackRequestClass::Regular);
        assert_eq!(
            config.sounds[1].source_path(&config.audio_path),
            "/static/audio/message.ogg"
        );
    }

    #[test]
    fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        create_test_config(
            temp_dir.path(),
            "audio.json",
            r#"{"cache_capacity": 3, "sounds": [{"id": "alert", "class": "important"}]}"#,
        );

        let loader = ConfigLoader::new(temp_dir.path());
        let config = loader.load("audio.json").unwrap();

        assert_eq!(config.cache_capacity, 3);
        assert_eq!(config.audio_path, "/audio");
        assert_eq!(config.sounds[0].class, PlaybackRequestClass::Important);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp_dir = TempDir::new().unwrap();
        create_test_config(temp_dir.path(), "earcon.yaml", "cache_capacity: 0\n");

        let loader = ConfigLoader::new(temp_dir.path());
        assert!(matches!(
            loader.load("earcon.yaml"),
            Err(Error::ConfigValidation(..))
        ));
    }

    #[test]
    fn test_parse_error_reported() {
        let temp_dir = TempDir::new().unwrap();
        create_test_config(temp_dir.path(), "earcon.yaml", "preference: loud\n");

        let loader = ConfigLoader::new(temp_dir.path());
        assert!(matches!(loader.load("earcon.yaml"), Err(Error::ConfigParse(..))));
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(temp_dir.path());
        assert!(matches!(loader.load("earcon.yaml"), Err(Error::ConfigLoad(..))));
    }

    #[test]
    fn test_load_default_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(temp_dir.path());
        assert_eq!(loader.load_default().unwrap(), AudioConfig::default());
    }

    #[test]
    fn test_multi_dir_override() {
        let builtin_dir = TempDir::new().unwrap();
        let user_dir = TempDir::new().unwrap();

        create_test_config(builtin_dir.path(), "earcon.yaml", "cache_capacity: 10\n");
        create_test_config(user_dir.path(), "earcon.yaml", "cache_capacity: 20\n");

        let loader = ConfigLoader::new_with_dirs(vec![
            builtin_dir.path().to_path_buf(),
            user_dir.path().to_path_buf(),
        ]);

        assert_eq!(loader.load_default().unwrap().cache_capacity, 20);
    }

    #[test]
    fn test_cached_until_cleared() {
        let temp_dir = TempDir::new().unwrap();
        create_test_config(temp_dir.path(), "earcon.yaml", "cache_capacity: 5\n");

        let loader = ConfigLoader::new(temp_dir.path());
        assert_eq!(loader.load("earcon.yaml").unwrap().cache_capacity, 5);

        create_test_config(temp_dir.path(), "earcon.yaml", "cache_capacity: 6\n");
        assert_eq!(loader.load("earcon.yaml").unwrap().cache_capacity, 5);

        loader.clear_cache().unwrap();
        assert_eq!(loader.load("earcon.yaml").unwrap().cache_capacity, 6);
    }

    #[test]
    fn test_discover_all() {
        let builtin_dir = TempDir::new().unwrap();
        let user_dir = TempDir::new().unwrap();

        create_test_config(builtin_dir.path(), "earcon.yaml", "{}");
        create_test_config(user_dir.path(), "earcon.yaml", "{}");
        create_test_config(user_dir.path(), "extra.json", "{}");
        create_test_config(user_dir.path(), "notes.txt", "ignored");

        let loader = ConfigLoader::new_with_dirs(vec![
            builtin_dir.path().to_path_buf(),
            user_dir.path().to_path_buf(),
            PathBuf::from("/tmp/nonexistent_earcon_config_dir_test"),
        ]);

        assert_eq!(
            loader.discover_all().unwrap(),
            vec!["earcon.yaml".to_string(), "extra.json".to_string()]
        );
    }

    #[test]
    fn test_from_yaml_str() {
        let config = ConfigLoader::from_yaml_str("preload: true\n").unwrap();
        assert!(config.preload);
        assert!(ConfigLoader::from_yaml_str("cache_capacity: 0\n").is_err());
    }
}
