//! Configuration builder for flexible configuration loading

use crate::{Config, ConfigError, ConfigResult};
use config::{ConfigBuilder as ConfigBuilderInner, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tunemirror_types::{RenameLimit, ThreadCount};

/// Configuration builder for loading configuration from multiple sources
#[derive(Debug)]
pub struct ConfigBuilder {
    inner: ConfigBuilderInner<config::builder::DefaultState>,
    sources: Vec<ConfigSource>,
    env_separator: String,
}

#[derive(Debug, Clone)]
enum ConfigSource {
    File { path: PathBuf, format: FileFormat },
    Environment { prefix: String },
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            inner: config::Config::builder(),
            sources: Vec::new(),
            env_separator: "__".to_string(),
        }
    }

    /// Add a configuration file source; missing files are ignored
    pub fn add_source_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let format = Self::detect_format(&path);
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add a configuration file source with explicit format
    pub fn add_source_file_with_format<P: AsRef<Path>>(
        mut self,
        path: P,
        format: FileFormat,
    ) -> Self {
        let path = path.as_ref().to_path_buf();
        self.sources.push(ConfigSource::File { path, format });
        self
    }

    /// Add environment variable source with prefix
    pub fn add_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.sources.push(ConfigSource::Environment {
            prefix: prefix.into(),
        });
        self
    }

    /// Set environment variable separator (default: "__")
    pub fn env_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.env_separator = separator.into();
        self
    }

    /// Build the configuration
    pub fn build(mut self) -> ConfigResult<Config> {
        // Defaults form the base layer
        let defaults_value = serde_yaml::to_value(Config::default())?;
        self.inner = self
            .inner
            .add_source(config::Config::try_from(&defaults_value)?);

        for source in &self.sources {
            match source {
                ConfigSource::File { path, format } => {
                    if path.exists() {
                        self.inner = self
                            .inner
                            .add_source(File::from(path.clone()).format(*format));
                    }
                }
                ConfigSource::Environment { prefix } => {
                    self.inner = self.inner.add_source(
                        Environment::with_prefix(prefix)
                            .prefix_separator(&self.env_separator)
                            .separator(&self.env_separator)
                            .try_parsing(true),
                    );
                }
            }
        }

        let config = self.inner.build()?;
        let result: Config = config.try_deserialize()?;

        Self::validate(&result)?;

        Ok(result)
    }

    /// Try to build the configuration, returning defaults on error
    pub fn build_or_default(self) -> Config {
        self.build().unwrap_or_default()
    }

    /// Detect file format from extension
    fn detect_format(path: &Path) -> FileFormat {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    /// Validate the configuration
    pub fn validate(config: &Config) -> ConfigResult<()> {
        let threads = config.performance.threads.get();
        if !(ThreadCount::MIN..=ThreadCount::MAX).contains(&threads) {
            return Err(ConfigError::setting(format!(
                "Thread count must be between {} and {}",
                ThreadCount::MIN,
                ThreadCount::MAX
            )));
        }

        if config.performance.pool_tick_ms == 0 {
            return Err(ConfigError::setting(
                "Pool tick must be greater than 0",
            ));
        }

        if RenameLimit::new(config.sync.rename_attempt_limit.get()).is_err() {
            return Err(ConfigError::setting(
                "Rename attempt limit must be greater than 0",
            ));
        }

        if config.encoder.sox_path.as_os_str().is_empty() {
            return Err(ConfigError::setting("Encoder path must not be empty"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&config.logging.level.as_str()) {
            return Err(ConfigError::setting(
                "Log level must be one of: trace, debug, info, warn, error",
            ));
        }

        config.rules.rule_book().map(|_| ())
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EncodeSpec;
    use std::io::Write;
    use tempfile::Builder;

    fn yaml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert!(config.sync.preserve_timestamps);
        assert!(!config.sync.dry_run);
        assert_eq!(config.sync.rename_attempt_limit.get(), RenameLimit::DEFAULT);
        assert_eq!(config.encoder.sox_path, PathBuf::from("sox"));
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_builder_yaml_file() {
        let file = yaml_file(
            r#"
performance:
  threads: 8
sync:
  dry_run: true
encoder:
  sox_path: /opt/sox/bin/sox
rules:
  encode:
    - { match: { category: lossy, min_bitrate: 96 }, action: skip }
    - { match: { category: lossless }, action: { extension: ogg, quality: 6 } }
  remove_missing:
    - { match: { pattern: "\\.keep$" }, action: false }
"#,
        );

        let config = ConfigBuilder::new()
            .add_source_file(file.path())
            .build()
            .unwrap();

        assert_eq!(config.performance.threads.get(), 8);
        assert!(config.sync.dry_run);
        assert!(config.sync.preserve_timestamps);
        assert_eq!(config.encoder.sox_path, PathBuf::from("/opt/sox/bin/sox"));
        assert_eq!(config.rules.encode.len(), 2);
        assert_eq!(
            config.rules.encode[1].action,
            EncodeSpec::Convert {
                extension: Some("ogg".into()),
                quality: Some(6.0)
            }
        );
        assert!(!config.rules.remove_missing[0].action);
    }

    #[test]
    fn test_builder_validation() {
        let file = yaml_file("performance:\n  threads: 0\n");

        let result = ConfigBuilder::new().add_source_file(file.path()).build();

        let error = result.unwrap_err();
        assert!(matches!(error, ConfigError::Setting { .. }));
        assert!(error.to_string().contains("Thread count must be between"));
    }

    #[test]
    fn test_builder_rejects_invalid_rules() {
        let file = yaml_file("rules:\n  clobber:\n    - { action: { suffix: \"\" } }\n");

        let result = ConfigBuilder::new().add_source_file(file.path()).build();

        assert!(result.unwrap_err().to_string().contains("rules.clobber[0]"));
    }

    #[test]
    fn test_builder_env_override() {
        std::env::set_var("TUNEMIRROR_BUILDER_TEST__SYNC__RENAME_ATTEMPT_LIMIT", "12");

        let config = ConfigBuilder::new()
            .add_env_prefix("TUNEMIRROR_BUILDER_TEST")
            .build()
            .unwrap();

        std::env::remove_var("TUNEMIRROR_BUILDER_TEST__SYNC__RENAME_ATTEMPT_LIMIT");
        assert_eq!(config.sync.rename_attempt_limit.get(), 12);
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let config = ConfigBuilder::new()
            .add_source_file("/nonexistent/tunemirror.yaml")
            .build()
            .unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
