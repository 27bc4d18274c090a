//! Configuration - figment による設定読み込み
//!
//! 優先順位: デフォルト値 < `squish.toml` < 環境変数 `SQUISH__SECTION__KEY`

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::app::retry::RetryPolicy;
use crate::ports::TransformParams;

pub const DEFAULT_CONFIG_FILE: &str = "squish.toml";
pub const ENV_PREFIX: &str = "SQUISH__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where the transport stages uploads.
    pub upload_dir: PathBuf,
    /// Where derived artifacts live during their retention window.
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("compressed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub max_batch_size: usize,
    /// Capacity of the real-time event channel.
    pub event_buffer: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 100,
            event_buffer: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SquishConfig {
    pub storage: StorageConfig,
    pub transform: TransformParams,
    pub retention: RetentionConfig,
    pub deletion: RetryPolicy,
    pub batch: BatchConfig,
    /// Prefix of retrieval references handed to clients.
    pub public_base_url: String,
}

impl Default for SquishConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            transform: TransformParams::default(),
            retention: RetentionConfig::default(),
            deletion: RetryPolicy::default(),
            batch: BatchConfig::default(),
            public_base_url: String::from("http://localhost:5000"),
        }
    }
}

impl SquishConfig {
    /// Defaults, then `squish.toml` in the working directory, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(SquishConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.transform.max_dimension == 0 {
            return invalid("transform.max_dimension must be greater than 0");
        }
        if !(1..=100).contains(&self.transform.quality) {
            return invalid("transform.quality must be between 1 and 100");
        }
        if self.retention.window.is_zero() {
            return invalid("retention.window must be greater than 0");
        }
        if self.deletion.max_attempts == 0 {
            return invalid("deletion.max_attempts must be at least 1");
        }
        if self.deletion.multiplier.is_nan() || self.deletion.multiplier < 1.0 {
            return invalid("deletion.multiplier must be at least 1.0");
        }
        if self.batch.max_batch_size == 0 {
            return invalid("batch.max_batch_size must be greater than 0");
        }
        if self.public_base_url.trim().is_empty() {
            return invalid("public_base_url must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::OutputFormat;
    use figment::Jail;

    #[test]
    fn defaults_follow_the_upload_service() {
        let config = SquishConfig::default();
        assert_eq!(config.transform.max_dimension, 800);
        assert_eq!(config.transform.format, OutputFormat::Webp);
        assert_eq!(config.transform.quality, 80);
        assert_eq!(config.retention.window, Duration::from_secs(50));
        assert_eq!(config.batch.max_batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "squish.toml",
                r#"
                public_base_url = "https://img.example.com"

                [transform]
                format = "jpeg"
                quality = 70

                [retention]
                window = "2m"

                [deletion]
                base_delay = "250ms"
                "#,
            )?;
            jail.set_env("SQUISH__TRANSFORM__MAX_DIMENSION", "1024");

            let config = SquishConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.public_base_url, "https://img.example.com");
            assert_eq!(config.transform.format, OutputFormat::Jpeg);
            assert_eq!(config.transform.quality, 70);
            assert_eq!(config.transform.max_dimension, 1024);
            assert_eq!(config.retention.window, Duration::from_secs(120));
            assert_eq!(config.deletion.base_delay, Duration::from_millis(250));
            assert_eq!(config.deletion.max_attempts, 4);
            Ok(())
        });
    }

    #[test]
    fn missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = SquishConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config, SquishConfig::default());
            Ok(())
        });
    }

    #[test]
    fn invalid_values_are_rejected_on_load() {
        Jail::expect_with(|jail| {
            jail.set_env("SQUISH__TRANSFORM__QUALITY", "0");
            let err = SquishConfig::load().unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
            Ok(())
        });
    }

    #[test]
    fn validate_catches_unusable_retry_policy() {
        let mut config = SquishConfig::default();
        config.deletion.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = SquishConfig::default();
        config.deletion.multiplier = 0.5;
        assert!(config.validate().is_err());
    }
}
