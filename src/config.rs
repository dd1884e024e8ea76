//! Layered application configuration.
//!
//! Settings are merged with figment, later layers overriding earlier ones:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. TOML file: `--config PATH`, or `config.toml` in the platform config
//!    directory when present
//! 3. `ROTODUPE_*` environment variables (for example `ROTODUPE_HASH_SIZE=16`)
//! 4. Command-line flags, applied by the CLI after loading
//!
//! ```toml
//! hash_size = 8
//! highfreq_factor = 4
//! threshold = 0.0
//! match_mode = "rotated"
//! extensions = ["png", "jpg"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::duplicates::{FinderConfig, GroupingConfig, MatchMode};
use crate::hash::{DEFAULT_HASH_SIZE, DEFAULT_HIGHFREQ_FACTOR};
use crate::scanner::{
    normalize_extension, HasherConfig, WalkerConfig, DEFAULT_EXTENSIONS, DEFAULT_MAX_DIMENSION,
};

/// Prefix of the environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "ROTODUPE_";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors raised while loading, validating or saving configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer could not be read or has the wrong shape.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configuration file could not be written.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path of the configuration file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No platform configuration directory could be determined.
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Side of each fingerprint bit matrix.
    pub hash_size: usize,
    /// Oversampling factor applied before the DCT.
    pub highfreq_factor: usize,
    /// Decode cap on image width and height.
    pub max_dimension: u32,
    /// Scanned extensions (case-insensitive, leading dot optional).
    pub extensions: Vec<String>,
    /// Largest difference still grouped as a duplicate. `0.0` means exact.
    pub threshold: f64,
    /// Rotation pairing rule.
    pub match_mode: MatchMode,
    /// Hashing threads; 0 uses one per CPU.
    pub threads: usize,
    /// Per-image hashing time limit in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_timeout_secs: Option<u64>,
    /// Follow symbolic links while walking.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Gitignore-style patterns to skip.
    pub ignore_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_size: DEFAULT_HASH_SIZE,
            highfreq_factor: DEFAULT_HIGHFREQ_FACTOR,
            max_dimension: DEFAULT_MAX_DIMENSION,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_string()).collect(),
            threshold: 0.0,
            match_mode: MatchMode::Aligned,
            threads: 0,
            hash_timeout_secs: None,
            follow_symlinks: false,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
        }
    }
}

impl Config {
    /// Load defaults, the configuration file and the environment.
    ///
    /// An explicit `path` must exist; the platform default file is optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a layer is malformed or the explicit
    /// file is missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::Io {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "configuration file not found",
                        ),
                    });
                }
                log::debug!("Loading configuration from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(default_path) = Self::default_path().filter(|p| p.is_file()) {
                    log::debug!("Loading configuration from {}", default_path.display());
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Load defaults overridden by a single TOML file, ignoring the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the file is malformed.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Platform-specific location of `config.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "rotodupe").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an odd or zero hash size, a zero
    /// oversampling factor or decode cap, or a threshold outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.hasher_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be between 0 and 1, got {}",
                self.threshold
            )));
        }
        if self.extensions.iter().any(|e| normalize_extension(e).is_empty()) {
            return Err(ConfigError::Invalid(
                "extensions must not contain empty entries".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write this configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.to_toml()?).map_err(io_err)
    }

    /// Hashing parameters.
    #[must_use]
    pub fn hasher_config(&self) -> HasherConfig {
        HasherConfig::new(self.hash_size, self.highfreq_factor)
            .with_max_dimension(self.max_dimension)
    }

    /// Grouping parameters.
    #[must_use]
    pub fn grouping_config(&self) -> GroupingConfig {
        GroupingConfig::default()
            .with_threshold(self.threshold)
            .with_match_mode(self.match_mode)
    }

    /// Walker parameters.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(
            self.follow_symlinks,
            self.skip_hidden,
            self.ignore_patterns.clone(),
            &self.extensions,
        )
    }

    /// Per-image hashing limit.
    #[must_use]
    pub fn hash_timeout(&self) -> Option<Duration> {
        self.hash_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Finder configuration without shutdown flag or progress callback.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_hasher(self.hasher_config())
            .with_grouping(self.grouping_config())
            .with_walker_config(self.walker_config())
            .with_threads(self.threads)
            .with_hash_timeout(self.hash_timeout())
    }
}
