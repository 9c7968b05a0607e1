//! Errors raised while loading settings and declared rules

use std::path::PathBuf;
use thiserror::Error;
use tunemirror_types::Error as TunemirrorError;

/// Why a configuration could not be loaded, checked or written
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A config file is missing, unreadable or unwritable
    #[error("Config file '{path}': {source}")]
    File {
        /// Path of the config file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The defaults, file and `TUNEMIRROR__*` layers do not merge into a config
    #[error("Cannot merge config layers: {message}")]
    Layers {
        /// Message from the layering library
        message: String,
    },

    /// A setting outside its allowed range
    #[error("Invalid setting: {message}")]
    Setting {
        /// What is wrong with the setting
        message: String,
    },

    /// A declared rule that cannot be registered on the rule book
    #[error("Invalid rule {key}: {message}")]
    Rule {
        /// Table and index, e.g. `rules.clobber[2]`
        key: String,
        /// Why the rule was rejected
        message: String,
    },

    /// The config could not be rendered for saving or display
    #[error("Cannot render config as {format}: {message}")]
    Render {
        /// Output format
        format: &'static str,
        /// Serializer message
        message: String,
    },
}

impl From<config::ConfigError> for ConfigError {
    fn from(error: config::ConfigError) -> Self {
        Self::Layers {
            message: error.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::render("YAML", error)
    }
}

impl From<ConfigError> for TunemirrorError {
    fn from(error: ConfigError) -> Self {
        TunemirrorError::config(error.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// Out-of-range setting
    pub fn setting<S: Into<String>>(message: S) -> Self {
        Self::Setting {
            message: message.into(),
        }
    }

    /// Rejected rule at `key`
    pub fn rule<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::Rule {
            key: key.into(),
            message: message.into(),
        }
    }

    pub(crate) fn render(format: &'static str, error: impl std::fmt::Display) -> Self {
        Self::Render {
            format,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunemirror_types::ErrorKind;

    #[test]
    fn test_rule_error_names_its_table() {
        let error: TunemirrorError = ConfigError::rule("rules.encode[0]", "unknown action").into();
        assert_eq!(error.kind(), ErrorKind::Config);
        assert!(error.to_string().contains("Invalid rule rules.encode[0]"));
    }

    #[test]
    fn test_render_error_names_format() {
        let error = ConfigError::render("TOML", "unsupported value");
        assert_eq!(
            error.to_string(),
            "Cannot render config as TOML: unsupported value"
        );
    }
}
