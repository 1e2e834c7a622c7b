//! Service configuration.
//!
//! Configuration for the grouping, generation and selection layers:
//! cohort size, variant concurrency, backend call timeout, recommendation
//! cache bounds and storage location.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the lessonforge service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    // Grouping settings
    /// Learners per cohort.
    pub group_size: usize,

    // Generation settings
    /// Maximum number of variants generating at once.
    pub max_concurrent_variants: usize,
    /// Bound applied to every individual backend call.
    pub call_timeout: Duration,
    /// Narration voice override for speech generation.
    pub speech_voice: Option<String>,

    // Selection settings
    /// TTL of the global-recommendation cache.
    pub cache_ttl: Duration,
    /// Capacity of the global-recommendation cache.
    pub cache_max_entries: usize,

    // Storage settings
    /// PostgreSQL connection URL.
    pub database_url: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            group_size: 6,
            max_concurrent_variants: 4,
            call_timeout: Duration::from_secs(180),
            speech_voice: None,
            cache_ttl: Duration::from_secs(300),
            cache_max_entries: 256,
            database_url: "postgres://localhost/lessonforge".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LESSONFORGE_GROUP_SIZE`: learners per cohort (default: 6)
    /// - `LESSONFORGE_MAX_CONCURRENT_VARIANTS`: concurrent variants (default: 4)
    /// - `LESSONFORGE_CALL_TIMEOUT_SECS`: backend call timeout (default: 180)
    /// - `LESSONFORGE_SPEECH_VOICE`: narration voice id (optional)
    /// - `LESSONFORGE_CACHE_TTL_SECS`: recommendation cache TTL (default: 300)
    /// - `LESSONFORGE_CACHE_MAX_ENTRIES`: recommendation cache size (default: 256)
    /// - `DATABASE_URL`: PostgreSQL connection URL (required)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("LESSONFORGE_GROUP_SIZE") {
            config.group_size = parse_env_value(&val, "LESSONFORGE_GROUP_SIZE")?;
        }

        if let Ok(val) = std::env::var("LESSONFORGE_MAX_CONCURRENT_VARIANTS") {
            config.max_concurrent_variants =
                parse_env_value(&val, "LESSONFORGE_MAX_CONCURRENT_VARIANTS")?;
        }

        if let Ok(val) = std::env::var("LESSONFORGE_CALL_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "LESSONFORGE_CALL_TIMEOUT_SECS")?;
            config.call_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("LESSONFORGE_SPEECH_VOICE") {
            config.speech_voice = Some(val);
        }

        if let Ok(val) = std::env::var("LESSONFORGE_CACHE_TTL_SECS") {
            let secs: u64 = parse_env_value(&val, "LESSONFORGE_CACHE_TTL_SECS")?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("LESSONFORGE_CACHE_MAX_ENTRIES") {
            config.cache_max_entries = parse_env_value(&val, "LESSONFORGE_CACHE_MAX_ENTRIES")?;
        }

        config.database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "group_size must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrent_variants == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_concurrent_variants must be greater than 0".to_string(),
            ));
        }

        if self.call_timeout.as_secs() == 0 {
            return Err(ConfigError::ValidationFailed(
                "call_timeout must be greater than 0".to_string(),
            ));
        }

        if self.cache_max_entries == 0 {
            return Err(ConfigError::ValidationFailed(
                "cache_max_entries must be greater than 0".to_string(),
            ));
        }

        if self.database_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_group_size(mut self, size: usize) -> Self {
        self.group_size = size;
        self
    }

    pub fn with_max_concurrent_variants(mut self, max: usize) -> Self {
        self.max_concurrent_variants = max;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_speech_voice(mut self, voice: impl Into<String>) -> Self {
        self.speech_voice = Some(voice.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
