//! User configuration loaded from a TOML file.
//!
//! The default location is `<config dir>/pianola/config.toml`. Every field
//! is optional; command-line flags override the file.

use crate::piano::DEFAULT_TEMPO;
use crate::recorder::{Millis, RecorderSettings};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Computer keyboard settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// On terminals without key release events, how long a key stays held
    /// after its last press. Must exceed the terminal's autorepeat delay.
    pub key_release_ms: Millis,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            key_release_ms: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SoundFont (.sf2) used for sound. None plays silently.
    pub soundfont: Option<PathBuf>,
    /// General MIDI program (0 = Acoustic Grand Piano).
    pub program: u8,
    pub velocity: u8,
    /// Tempo used to interpret duration tokens.
    pub tempo: u32,
    /// Write logs here instead of stderr.
    pub log_file: Option<PathBuf>,
    pub recorder: RecorderSettings,
    pub input: InputSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            soundfont: None,
            program: 0,
            velocity: 100,
            tempo: DEFAULT_TEMPO,
            log_file: None,
            recorder: RecorderSettings::default(),
            input: InputSettings::default(),
        }
    }
}

impl Config {
    /// Path of the per-user config file, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pianola").join("config.toml"))
    }

    /// Loads the configuration.
    ///
    /// An explicit path must exist. Without one, the default file is used
    /// when present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Reads and validates a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()
    }

    /// Checks value ranges that the TOML types cannot express.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.program > 127 {
            return Err(ConfigError::Invalid {
                field: "program",
                reason: format!("{} is outside 0-127", self.program),
            });
        }
        if !(1..=127).contains(&self.velocity) {
            return Err(ConfigError::Invalid {
                field: "velocity",
                reason: format!("{} is outside 1-127", self.velocity),
            });
        }
        if self.tempo == 0 {
            return Err(ConfigError::Invalid {
                field: "tempo",
                reason: "must be positive".to_string(),
            });
        }
        if self.input.key_release_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "input.key_release_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piano::DurationToken;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.recorder.flash_ms, 200);
        assert_eq!(config.recorder.tail_ms, 500);
        assert_eq!(config.recorder.default_duration, DurationToken::Eighth);
        assert_eq!(config.input.key_release_ms, 600);
        assert!(config.soundfont.is_none());
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
soundfont = "/usr/share/sounds/sf2/piano.sf2"
program = 4
velocity = 90
tempo = 100

[recorder]
default_duration = "4n"
tail_ms = 750

[input]
key_release_ms = 450
"#,
        );
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(
            config.soundfont.as_deref(),
            Some(Path::new("/usr/share/sounds/sf2/piano.sf2"))
        );
        assert_eq!(config.program, 4);
        assert_eq!(config.velocity, 90);
        assert_eq!(config.tempo, 100);
        assert_eq!(config.recorder.default_duration, DurationToken::Quarter);
        assert_eq!(config.recorder.tail_ms, 750);
        // Unset fields in a table keep their defaults.
        assert_eq!(config.recorder.flash_ms, 200);
        assert_eq!(config.input.key_release_ms, 450);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let file = write_config("");
        assert_eq!(Config::load_from(file.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            Config::load(Some(&missing)),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        let file = write_config("velocity = \"loud\"");
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));

        let file = write_config("[recorder]\ndefault_duration = \"3n\"");
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validation() {
        let file = write_config("velocity = 0");
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Invalid {
                field: "velocity",
                ..
            })
        ));

        let config = Config {
            program: 200,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            tempo: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
