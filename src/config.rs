//! Recorder configuration
//!
//! Lives as `blackbox.toml` next to the log files. When the file is
//! missing the defaults are written out, so a fresh card always ends up
//! with an editable configuration.

use blackbox_core::pipeline::{FatalError, Preallocation};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file inside the log directory
pub const CONFIG_FILE_NAME: &str = "blackbox.toml";

/// Receive ring capacity in bytes
///
/// The largest chunk is ten sectors, so about 2/5 of the ring stays free
/// for the receiver while a chunk is being written.
pub const RX_BUFFER_SIZE: usize = 24 * 4096;

/// Storage sector the log chunks are aligned to
pub const LOG_SECTOR_SIZE: usize = 4096;

/// Error loading or creating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// Configuration file
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// Defaults could not be written
    #[error("cannot write {path}: {source}")]
    Write {
        /// Configuration file
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },
    /// File is not valid TOML for this configuration
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// Defaults could not be serialized
    #[error("cannot serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// The fatal condition the recorder signals for this error
    pub fn fatal(&self) -> FatalError {
        match self {
            Self::Write { .. } | Self::Serialize(_) => FatalError::ConfigWrite,
            Self::Read { .. } => FatalError::ConfigRead,
            Self::Parse(_) | Self::Invalid(_) => FatalError::ConfigInvalid,
        }
    }
}

/// Recorder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Serial baud rate
    pub baud_rate: u32,
    /// First log file name; the last digit run is the counter
    pub log_name: String,
    /// How long to wait for a full sector before writing what arrived
    pub chunk_timeout_ms: u32,
    /// Bytes to reserve for each new log file, 0 for none
    pub prealloc_bytes: u64,
    /// Allocate the reservation immediately
    pub prealloc_grow: bool,
    /// Message announced in Morse once the configuration is loaded
    pub startup_morse: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            log_name: "log000.txt".into(),
            chunk_timeout_ms: 200,
            prealloc_bytes: 0,
            prealloc_grow: false,
            startup_morse: String::new(),
        }
    }
}

impl Config {
    /// Check values the recorder cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be positive".into()));
        }
        if !self.log_name.bytes().any(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Invalid(format!(
                "log_name {:?} has no counter digits",
                self.log_name
            )));
        }
        if let Some(c) = self
            .startup_morse
            .chars()
            .find(|&c| !crate::signal::is_morse(c))
        {
            return Err(ConfigError::Invalid(format!(
                "startup_morse {:?} has no Morse for {:?}",
                self.startup_morse, c
            )));
        }
        Ok(())
    }

    /// Log file reservation
    pub fn preallocation(&self) -> Preallocation {
        Preallocation {
            bytes: self.prealloc_bytes,
            grow: self.prealloc_grow,
        }
    }
}

/// Load `blackbox.toml` from `dir`, writing the defaults if it is missing
pub fn load_or_create(dir: &Path) -> Result<Config, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);

    let config = match std::fs::read_to_string(&path) {
        Ok(text) => {
            let config: Config = toml::from_str(&text)?;
            log::info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let config = Config::default();
            std::fs::write(&path, toml::to_string(&config)?).map_err(|source| ConfigError::Write {
                path: path.clone(),
                source,
            })?;
            log::info!("Created default configuration {}", path.display());
            config
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("blackbox-config-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = temp_dir("defaults");
        let config = load_or_create(&dir).unwrap();
        assert_eq!(config, Config::default());

        let text = std::fs::read_to_string(dir.join(CONFIG_FILE_NAME)).unwrap();
        assert!(text.contains("baud_rate = 115200"));
        assert_eq!(load_or_create(&dir).unwrap(), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_partial_file_uses_defaults_for_the_rest() {
        let dir = temp_dir("partial");
        std::fs::write(dir.join(CONFIG_FILE_NAME), "baud_rate = 921600\n").unwrap();
        let config = load_or_create(&dir).unwrap();
        assert_eq!(config.baud_rate, 921_600);
        assert_eq!(config.log_name, "log000.txt");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_bad_values_rejected() {
        let dir = temp_dir("bad");
        std::fs::write(dir.join(CONFIG_FILE_NAME), "baud_rate = 0\n").unwrap();
        assert!(matches!(load_or_create(&dir), Err(ConfigError::Invalid(_))));

        std::fs::write(dir.join(CONFIG_FILE_NAME), "log_name = \"log.txt\"\n").unwrap();
        assert!(matches!(load_or_create(&dir), Err(ConfigError::Invalid(_))));

        std::fs::write(dir.join(CONFIG_FILE_NAME), "baud = 9600\n").unwrap();
        let err = load_or_create(&dir).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(err.fatal(), FatalError::ConfigInvalid);

        std::fs::write(dir.join(CONFIG_FILE_NAME), "startup_morse = \"hi!\"\n").unwrap();
        assert!(matches!(load_or_create(&dir), Err(ConfigError::Invalid(_))));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_prealloc_and_startup_fields() {
        let dir = temp_dir("prealloc");
        std::fs::write(
            dir.join(CONFIG_FILE_NAME),
            "prealloc_bytes = 104857600\nprealloc_grow = true\nstartup_morse = \"ok\"\n",
        )
        .unwrap();
        let config = load_or_create(&dir).unwrap();
        assert_eq!(
            config.preallocation(),
            Preallocation {
                bytes: 104_857_600,
                grow: true
            }
        );
        assert_eq!(config.startup_morse, "ok");
        assert_eq!(config.chunk_timeout_ms, 200);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unreadable_file_maps_to_read_error() {
        let dir = temp_dir("unreadable");
        // A directory where the file should be cannot be read as text
        std::fs::create_dir_all(dir.join(CONFIG_FILE_NAME)).unwrap();
        let err = load_or_create(&dir).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.fatal(), FatalError::ConfigRead);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
