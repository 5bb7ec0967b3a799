//! Audio preference tiers and the gate that decides whether a sound may play.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// User-wide setting controlling which sounds are audible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioPreference {
    /// Every sound plays.
    #[default]
    All,
    /// Only important and always-audible sounds play.
    Some,
    /// Only always-audible sounds play.
    None,
}

impl AudioPreference {
    /// Returns true if a sound of `class` may play under this preference.
    pub fn permits(self, class: PlaybackRequestClass) -> bool {
        match self {
            AudioPreference::All => true,
            AudioPreference::Some => class != PlaybackRequestClass::Regular,
            AudioPreference::None => class == PlaybackRequestClass::AlwaysAudible,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AudioPreference::All => "all",
            AudioPreference::Some => "some",
            AudioPreference::None => "none",
        }
    }
}

impl fmt::Display for AudioPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(AudioPreference::All),
            "some" => Ok(AudioPreference::Some),
            "none" => Ok(AudioPreference::None),
            other => Err(Error::ConfigValidation(
                "preference".to_string(),
                format!("Unknown audio preference '{}' (expected all, some or none)", other),
            )),
        }
    }
}

/// Which preference tiers let a sound through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackRequestClass {
    /// Plays even when the preference is `None`.
    AlwaysAudible,
    /// Plays under `Some` and `All`.
    Important,
    /// Plays only under `All`.
    #[default]
    Regular,
}
