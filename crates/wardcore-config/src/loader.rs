//! Configuration loader with multi-source merging.

use crate::{ConfigError, Paths, WardcoreConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern.
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Creates a new config loader rooted at the current directory.
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "WARDCORE".to_string(),
        }
    }

    /// Sets the project directory.
    #[must_use]
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Sets the environment variable prefix (default: `WARDCORE`).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Loads configuration from all sources with proper precedence.
    pub fn load(self) -> Result<WardcoreConfig, ConfigError> {
        let mut builder = config::Config::builder();

        let defaults = WardcoreConfig::default();
        builder = builder.add_source(
            config::Config::try_from(&defaults)
                .map_err(|e| ConfigError::MergeError(e.to_string()))?,
        );

        let paths = Paths::new();
        if let Ok(user_config_file) = paths.user_config_file() {
            if user_config_file.exists() {
                builder = builder.add_source(
                    config::File::from(user_config_file)
                        .required(false)
                        .format(config::FileFormat::Toml),
                );
            }
        }

        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .separator("_")
                .try_parsing(true),
        );

        let built = builder
            .build()
            .map_err(|e| ConfigError::MergeError(e.to_string()))?;

        built
            .try_deserialize()
            .map_err(|e| ConfigError::MergeError(e.to_string()))
    }

    /// Loads configuration, falling back to defaults on any error.
    #[must_use]
    pub fn load_or_default(self) -> WardcoreConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn load_defaults_when_no_files_present() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let config = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .load()
            .expect("failed to load config");

        assert_eq!(config.detector.probe_interval_micros, 50_000);
        assert_eq!(config.net.bind_address, "127.0.0.1");
    }

    #[test]
    fn project_config_overrides_defaults() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("wardcore.toml"),
            r#"
[detector]
probe_interval_micros = 10000
timeout_micros = 50000

[net]
bind_address = "0.0.0.0"
"#,
        )
        .expect("failed to write project config");

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .load()
            .expect("failed to load config");

        assert_eq!(config.detector.probe_interval_micros, 10_000);
        assert_eq!(config.detector.timeout_micros, 50_000);
        assert_eq!(config.net.bind_address, "0.0.0.0");
        // Untouched keys keep their defaults.
        assert_eq!(config.txtable.tx_timeout_micros, 500);
    }

    #[test]
    fn local_config_overrides_project_config() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("wardcore.toml"),
            "[net]\nbind_address = \"127.0.0.1\"\n",
        )
        .expect("failed to write project config");

        fs::write(
            project_dir.join("wardcore.local.toml"),
            "[net]\nbind_address = \"10.0.0.1\"\n",
        )
        .expect("failed to write local config");

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .load()
            .expect("failed to load config");

        assert_eq!(config.net.bind_address, "10.0.0.1");
    }

    // Environment-variable precedence (WARDCORE_DETECTOR_TIMEOUT_MICROS=...)
    // is exercised by integration tests rather than here, since the `config`
    // crate reads process environment globally and unit tests run
    // concurrently within the same process.

    #[test]
    fn custom_env_prefix_is_honored() {
        let temp_dir = tempdir().expect("failed to create temp dir");
        let loader = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .with_env_prefix("WARDCORE_TEST_ONLY");
        assert_eq!(loader.env_prefix, "WARDCORE_TEST_ONLY");
    }
}
