//! Factory for wiring an engine from configuration
//!
//! Centralizes the store and entropy selection shared by the server binary
//! and the integration tests.

use std::sync::Arc;
use tracing::info;

use crate::{
    config::{EntropyProviderKind, MinesConfig, StorageBackend},
    entropy::{DisabledProvider, EntropyProvider, StaticProvider, TronGridProvider},
    errors::{ConfigurationError, MinesResult, StorageError},
    game_store::{GameStore, MemoryGameStore, RocksGameStore},
    games::{EngineSettings, MinesEngine},
    metrics::EngineMetrics,
    storage::OptimizedStorage,
};

pub struct EngineFactory;

impl EngineFactory {
    /// Build a fully configured engine. Metrics are attached when enabled.
    pub fn create_engine(config: &MinesConfig) -> MinesResult<(Arc<MinesEngine>, Option<Arc<EngineMetrics>>)> {
        config.validate()?;

        let store = Self::create_store(config)?;
        let entropy = Self::create_entropy(config)?;
        let mut engine = MinesEngine::new(store, entropy, EngineSettings::from(config));

        let metrics = if config.monitoring.enable_metrics {
            let metrics = Arc::new(EngineMetrics::new().map_err(|e| {
                ConfigurationError::ValidationFailed(format!("Failed to register metrics: {}", e))
            })?);
            engine = engine.with_metrics(metrics.clone());
            Some(metrics)
        } else {
            None
        };

        Ok((Arc::new(engine), metrics))
    }

    pub fn create_store(config: &MinesConfig) -> MinesResult<Arc<dyn GameStore>> {
        match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory game store");
                Ok(Arc::new(MemoryGameStore::new()))
            }
            StorageBackend::Rocksdb => {
                info!(path = %config.storage.data_directory, "Opening RocksDB game store");
                let storage = OptimizedStorage::new_with_config(&config.storage)
                    .map_err(|e| StorageError::DatabaseOpenFailed(e.to_string()))?;
                Ok(Arc::new(RocksGameStore::open(storage)?))
            }
        }
    }

    pub fn create_entropy(config: &MinesConfig) -> MinesResult<Arc<dyn EntropyProvider>> {
        let provider: Arc<dyn EntropyProvider> = match config.entropy.provider {
            EntropyProviderKind::Trongrid => Arc::new(
                TronGridProvider::new(config.entropy.endpoint.clone(), config.entropy_timeout())
                    .map_err(|e| ConfigurationError::ValidationFailed(e.to_string()))?,
            ),
            EntropyProviderKind::Static => {
                let seed = config
                    .entropy
                    .static_seed
                    .clone()
                    .ok_or_else(|| ConfigurationError::MissingRequired("entropy.static_seed".to_string()))?;
                Arc::new(StaticProvider::new(seed))
            }
            EntropyProviderKind::Disabled => Arc::new(DisabledProvider),
        };

        info!(provider = provider.name(), "Entropy provider ready");
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ephemeral_engine() {
        let config = MinesConfig::ephemeral("seed123");
        let (engine, metrics) = EngineFactory::create_engine(&config).unwrap();
        assert!(metrics.is_some());

        let started = engine
            .start(crate::games::StartRequest {
                size: 4,
                bomb_count: 3,
                client_seed: "abc".to_string(),
                bet: None,
            })
            .await
            .unwrap();
        assert_eq!(started.server_seed_public.as_deref(), Some("seed123"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = MinesConfig::ephemeral("seed123");
        config.entropy.static_seed = None;
        assert!(EngineFactory::create_engine(&config).is_err());
    }
}
