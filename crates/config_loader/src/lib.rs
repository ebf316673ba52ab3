//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON alignment configuration files
//! - Validate configuration legality
//! - Merge command-line overrides on top of file values
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("weaver.toml")).unwrap();
//! println!("tolerance: {}ms", config.outlier_tolerance_ms);
//! ```

mod parser;
mod validator;

pub use contracts::{AlignmentConfig, ManualTweak};
pub use parser::ConfigFormat;
pub use self::validator::MAX_TWEAK_MICROS;

use contracts::WeaverError;
use std::path::Path;
use tracing::debug;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<AlignmentConfig, WeaverError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        let config = Self::load_from_str(&content, format)?;
        debug!(path = %path.display(), ?format, "configuration loaded");
        Ok(config)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<AlignmentConfig, WeaverError> {
        Self::parse_and_validate(content, format)
    }

    /// Apply command-line tweaks: a tweak replaces any file tweak for the
    /// same file. The result is validated again.
    pub fn with_tweaks(
        mut config: AlignmentConfig,
        overrides: &[ManualTweak],
    ) -> Result<AlignmentConfig, WeaverError> {
        for tweak in overrides {
            config.tweaks.retain(|t| t.file != tweak.file);
            config.tweaks.push(*tweak);
        }
        self::validator::validate(&config)?;
        Ok(config)
    }

    /// Validate an already-built configuration
    pub fn validate(config: &AlignmentConfig) -> Result<(), WeaverError> {
        self::validator::validate(config)
    }

    /// Serialize AlignmentConfig to TOML string
    pub fn to_toml(config: &AlignmentConfig) -> Result<String, WeaverError> {
        toml::to_string_pretty(config)
            .map_err(|e| WeaverError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize AlignmentConfig to JSON string
    pub fn to_json(config: &AlignmentConfig) -> Result<String, WeaverError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| WeaverError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, WeaverError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            WeaverError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            WeaverError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, WeaverError> {
        std::fs::read_to_string(path).map_err(|e| WeaverError::input(path, e))
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<AlignmentConfig, WeaverError> {
        let config = parser::parse(content, format)?;
        self::validator::validate(&config)?;
        Ok(config)
    }
}
