//! Configuration management with validation and defaults
//!
//! Layering: built-in defaults, then an optional TOML file, then `MINES_*`
//! environment variables. The result is validated before use.

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};

use crate::{
    entropy::DEFAULT_TRONGRID_ENDPOINT,
    errors::{ConfigurationError, MinesResult},
    games::{payout::DEFAULT_HOUSE_EDGE, DisclosurePolicy},
};

/// Upper bound for the entropy fetch timeout
pub const MAX_ENTROPY_TIMEOUT_MS: u64 = 30_000;
/// Largest side length a grid may be configured with
pub const MAX_GRID_SIZE: u32 = 256;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinesConfig {
    pub server: ServerConfig,
    pub game: GameConfig,
    pub entropy: EntropyConfig,
    pub storage: StorageConfig,
    pub monitoring: MonitoringConfig,
}

/// HTTP binding
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Game rules
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub house_edge: f64,
    pub max_grid_size: u32,
    /// Default and maximum number of history entries returned
    pub history_limit: usize,
    pub disclosure: DisclosurePolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            house_edge: DEFAULT_HOUSE_EDGE,
            max_grid_size: 32,
            history_limit: 200,
            disclosure: DisclosurePolicy::Immediate,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntropyProviderKind {
    Trongrid,
    Static,
    Disabled,
}

/// Public entropy source
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EntropyConfig {
    pub provider: EntropyProviderKind,
    pub endpoint: String,
    pub timeout_ms: u64,
    /// Appended to public values to form the server seed
    pub seed_suffix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_seed: Option<String>,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            provider: EntropyProviderKind::Trongrid,
            endpoint: DEFAULT_TRONGRID_ENDPOINT.to_string(),
            timeout_ms: 5_000,
            seed_suffix: "2".to_string(),
            static_seed: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Rocksdb,
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    None,
    Snappy,
    Lz4,
    Zstd,
}

/// Storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_directory: String,
    pub write_buffer_size_mb: usize,
    pub compression_type: CompressionType,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Rocksdb,
            data_directory: "./DB/mines_data".to_string(),
            write_buffer_size_mb: 64,
            compression_type: CompressionType::Lz4,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Logging and metrics
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_metrics: bool,
    pub log_level: LogLevel,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            log_level: LogLevel::Info,
        }
    }
}

impl MinesConfig {
    /// In-memory store and static entropy, for tests and local runs
    pub fn ephemeral(static_seed: &str) -> Self {
        Self {
            entropy: EntropyConfig {
                provider: EntropyProviderKind::Static,
                static_seed: Some(static_seed.to_string()),
                seed_suffix: String::new(),
                ..Default::default()
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.server.port == 0 {
            return Err(invalid("server.port", "0", "Port cannot be zero"));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(invalid("server.request_timeout_secs", "0", "Timeout cannot be zero"));
        }

        let edge = self.game.house_edge;
        if !(edge > 0.0 && edge <= 1.0) {
            return Err(invalid(
                "game.house_edge",
                &edge.to_string(),
                "House edge factor must be in (0, 1]",
            ));
        }

        if self.game.max_grid_size == 0 || self.game.max_grid_size > MAX_GRID_SIZE {
            return Err(invalid(
                "game.max_grid_size",
                &self.game.max_grid_size.to_string(),
                "Grid size limit must be between 1 and 256",
            ));
        }

        if self.game.history_limit == 0 {
            return Err(invalid("game.history_limit", "0", "History limit cannot be zero"));
        }

        if self.entropy.timeout_ms == 0 || self.entropy.timeout_ms > MAX_ENTROPY_TIMEOUT_MS {
            return Err(invalid(
                "entropy.timeout_ms",
                &self.entropy.timeout_ms.to_string(),
                "Timeout must be between 1 and 30000 ms",
            ));
        }

        if self.entropy.provider == EntropyProviderKind::Static
            && self.entropy.static_seed.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigurationError::MissingRequired("entropy.static_seed".to_string()));
        }

        if self.entropy.provider == EntropyProviderKind::Trongrid && self.entropy.endpoint.is_empty() {
            return Err(ConfigurationError::MissingRequired("entropy.endpoint".to_string()));
        }

        if self.storage.backend == StorageBackend::Rocksdb && self.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()));
        }

        if self.storage.write_buffer_size_mb == 0 {
            return Err(invalid("storage.write_buffer_size_mb", "0", "Write buffer cannot be zero"));
        }

        Ok(())
    }

    pub fn entropy_timeout(&self) -> Duration {
        Duration::from_millis(self.entropy.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> MinesResult<MinesConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => MinesConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> MinesResult<MinesConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut MinesConfig) -> MinesResult<()> {
        if let Ok(host) = env::var("MINES_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("MINES_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| invalid("MINES_PORT", &port, "Invalid port number"))?;
        }

        if let Ok(data_dir) = env::var("MINES_DATA_DIR") {
            config.storage.data_directory = data_dir;
        }
        if let Ok(backend) = env::var("MINES_STORAGE_BACKEND") {
            config.storage.backend = match backend.to_ascii_lowercase().as_str() {
                "rocksdb" => StorageBackend::Rocksdb,
                "memory" => StorageBackend::Memory,
                _ => {
                    return Err(invalid(
                        "MINES_STORAGE_BACKEND",
                        &backend,
                        "Expected 'rocksdb' or 'memory'",
                    )
                    .into())
                }
            };
        }

        if let Ok(provider) = env::var("MINES_ENTROPY_PROVIDER") {
            config.entropy.provider = match provider.to_ascii_lowercase().as_str() {
                "trongrid" => EntropyProviderKind::Trongrid,
                "static" => EntropyProviderKind::Static,
                "disabled" => EntropyProviderKind::Disabled,
                _ => {
                    return Err(invalid(
                        "MINES_ENTROPY_PROVIDER",
                        &provider,
                        "Expected 'trongrid', 'static' or 'disabled'",
                    )
                    .into())
                }
            };
        }
        if let Ok(timeout) = env::var("MINES_ENTROPY_TIMEOUT_MS") {
            config.entropy.timeout_ms = timeout
                .parse()
                .map_err(|_| invalid("MINES_ENTROPY_TIMEOUT_MS", &timeout, "Invalid timeout value"))?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &MinesConfig, path: &str) -> MinesResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = MinesConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.game.house_edge, 0.98);
        assert_eq!(config.entropy.timeout_ms, 5_000);
        assert_eq!(config.game.disclosure, DisclosurePolicy::Immediate);
    }

    #[test]
    fn test_ephemeral_config_is_valid() {
        let config = MinesConfig::ephemeral("seed");
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = MinesConfig::default();
        config.game.house_edge = 1.5;
        assert!(config.validate().is_err());

        let mut config = MinesConfig::default();
        config.entropy.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = MinesConfig::default();
        config.entropy.provider = EntropyProviderKind::Static;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_grid_size_limit_bounds() {
        let mut config = MinesConfig::default();
        config.game.max_grid_size = MAX_GRID_SIZE;
        assert!(config.validate().is_ok());

        config.game.max_grid_size = MAX_GRID_SIZE + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));

        config.game.max_grid_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: MinesConfig = toml::from_str(
            r#"
            [game]
            disclosure = "on_finish"

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.game.disclosure, DisclosurePolicy::OnFinish);
        assert_eq!(config.game.history_limit, 200);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_save_and_load_config() -> MinesResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let mut original = MinesConfig::default();
        original.server.port = 4100;
        original.game.max_grid_size = 10;

        let loader = ConfigLoader::new();
        loader.save(&original, path)?;

        let loaded: MinesConfig = toml::from_str(&std::fs::read_to_string(path)?).unwrap();
        assert_eq!(loaded.server.port, 4100);
        assert_eq!(loaded.game.max_grid_size, 10);

        Ok(())
    }

    #[test]
    fn test_duration_conversions() {
        let config = MinesConfig::default();
        assert_eq!(config.entropy_timeout(), Duration::from_millis(5_000));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }
}
