//! Configuration management for tunemirror
//!
//! Settings and rule tables can be declared in YAML, TOML or JSON and layered with
//! environment overrides (`TUNEMIRROR__SECTION__KEY`).
//!
//! # Features
//!
//! - **Multiple formats**: YAML, TOML and JSON configuration files
//! - **Declarative rules**: every rule table of a [`tunemirror_rules::RuleBook`]
//! - **Validation**: invalid values and rules are rejected before a run starts
//! - **Environment overrides**: override any value with environment variables
//!
//! # Examples
//!
//! ```rust,no_run
//! use tunemirror_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_source_file("tunemirror.yaml")
//!     .add_env_prefix("TUNEMIRROR")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Encoders: {}", config.performance.threads.get());
//! let rules = config.rules.rule_book().expect("invalid rules");
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tunemirror_types::{RenameLimit, ThreadCount};

pub mod builder;
pub mod error;
pub mod loader;
pub mod rules;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use rules::{ClobberSpec, EncodeSpec, RuleSpec, RulesConfig, SelectorSpec};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Concurrency settings
    pub performance: PerformanceConfig,
    /// Run behaviour
    pub sync: SyncConfig,
    /// External encoder
    pub encoder: EncoderConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Rule tables applied on top of the defaults
    pub rules: RulesConfig,
}

/// Concurrency settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Number of concurrent encoders
    pub threads: ThreadCount,
    /// Worker pool coordinator tick in milliseconds
    pub pool_tick_ms: u64,
}

impl PerformanceConfig {
    /// Pool tick as a duration
    pub fn pool_tick(&self) -> Duration {
        Duration::from_millis(self.pool_tick_ms)
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            threads: ThreadCount::default(),
            pool_tick_ms: tunemirror_types::DEFAULT_POOL_TICK.as_millis() as u64,
        }
    }
}

/// Run behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Plan and report without writing
    pub dry_run: bool,
    /// Copy modification times onto copied files
    pub preserve_timestamps: bool,
    /// Candidates tried when renaming a colliding target
    pub rename_attempt_limit: RenameLimit,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            preserve_timestamps: true,
            rename_attempt_limit: RenameLimit::default(),
        }
    }
}

/// External encoder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// `sox` executable
    pub sox_path: PathBuf,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            sox_path: PathBuf::from("sox"),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON formatting
    pub json_format: bool,
    /// Enable colored output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            colored_output: true,
        }
    }
}
