//! Engine counters exported in Prometheus text format

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    pub games_started: IntCounter,
    pub cells_revealed: IntCounter,
    pub bombs_hit: IntCounter,
    pub cashouts: IntCounter,
    pub entropy_fallbacks: IntCounter,
    pub rejected: IntCounterVec,
}

impl EngineMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("mines".to_string()), None)?;

        let games_started = IntCounter::new("games_started_total", "Games created")?;
        let cells_revealed = IntCounter::new("cells_revealed_total", "Successful reveals")?;
        let bombs_hit = IntCounter::new("bombs_hit_total", "Reveals that hit a bomb")?;
        let cashouts = IntCounter::new("cashouts_total", "Games settled by cashout")?;
        let entropy_fallbacks = IntCounter::new(
            "entropy_fallbacks_total",
            "Games seeded from the local fallback",
        )?;
        let rejected = IntCounterVec::new(
            Opts::new("rejected_operations_total", "Operations rejected by the engine"),
            &["reason"],
        )?;

        registry.register(Box::new(games_started.clone()))?;
        registry.register(Box::new(cells_revealed.clone()))?;
        registry.register(Box::new(bombs_hit.clone()))?;
        registry.register(Box::new(cashouts.clone()))?;
        registry.register(Box::new(entropy_fallbacks.clone()))?;
        registry.register(Box::new(rejected.clone()))?;

        Ok(Self {
            registry,
            games_started,
            cells_revealed,
            bombs_hit,
            cashouts,
            entropy_fallbacks,
            rejected,
        })
    }

    pub fn record_rejection(&self, reason: &str) {
        self.rejected.with_label_values(&[reason]).inc();
    }

    /// Render all metrics in the Prometheus exposition format
    pub fn to_prometheus_format(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::warn!("Failed to encode metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
