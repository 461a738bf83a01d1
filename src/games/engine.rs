//! Game state machine and the operations built on it.
//!
//! Every mutation of a game runs under that game's lock: load, apply the
//! transition to a copy, persist, then publish. Games with different ids never
//! share a lock, so they proceed in parallel.

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{
    layout::generate_bomb_positions,
    types::{DisclosurePolicy, Game, GameDisclosure, GameParams, GameStatus, GameSummary, GameView, SeedOrigin},
};
use crate::{
    config::MinesConfig,
    entropy::{fetch_server_seed, EntropyProvider},
    errors::{GameError, MinesError, MinesResult},
    game_store::GameStore,
    metrics::EngineMetrics,
};

/// Engine tunables, usually derived from [`MinesConfig`]
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub house_edge: f64,
    pub max_grid_size: u32,
    pub history_limit: usize,
    pub disclosure: DisclosurePolicy,
    pub entropy_timeout: Duration,
    pub seed_suffix: String,
}

impl From<&MinesConfig> for EngineSettings {
    fn from(config: &MinesConfig) -> Self {
        Self {
            house_edge: config.game.house_edge,
            max_grid_size: config.game.max_grid_size,
            history_limit: config.game.history_limit,
            disclosure: config.game.disclosure,
            entropy_timeout: config.entropy_timeout(),
            seed_suffix: config.entropy.seed_suffix.clone(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&MinesConfig::default())
    }
}

/// Raw start request, validated by the engine
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub size: i64,
    pub bomb_count: i64,
    pub client_seed: String,
    pub bet: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub game_id: Uuid,
    /// Absent when the disclosure policy withholds the seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_seed_public: Option<String>,
    pub server_seed_hash: String,
    pub nonce: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevealOutcome {
    pub is_bomb: bool,
    pub opened_cells: Vec<u32>,
    pub multiplier: f64,
    pub game: GameView,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CashoutOutcome {
    pub payout_multiplier: f64,
    pub game: GameView,
}

pub struct MinesEngine {
    store: Arc<dyn GameStore>,
    entropy: Arc<dyn EntropyProvider>,
    settings: EngineSettings,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
    metrics: Option<Arc<EngineMetrics>>,
}

impl MinesEngine {
    pub fn new(
        store: Arc<dyn GameStore>,
        entropy: Arc<dyn EntropyProvider>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            entropy,
            settings,
            locks: DashMap::new(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<EngineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Create a game with a freshly committed layout
    pub async fn start(&self, request: StartRequest) -> MinesResult<StartOutcome> {
        let params = GameParams::validate(
            request.size,
            request.bomb_count,
            &request.client_seed,
            request.bet,
            self.settings.max_grid_size,
        )
        .map_err(|e| self.rejected(e))?;

        let seed = fetch_server_seed(
            self.entropy.as_ref(),
            self.settings.entropy_timeout,
            &self.settings.seed_suffix,
        )
        .await;

        let nonce = self.store.next_nonce().await?;
        let total_cells = params.size * params.size;
        let bomb_positions = generate_bomb_positions(
            &seed.value,
            &params.client_seed,
            nonce,
            total_cells,
            params.bomb_count,
        );

        let game = Game {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            size: params.size,
            bomb_count: params.bomb_count,
            total_cells,
            client_seed: params.client_seed,
            server_seed: seed.value,
            seed_origin: seed.origin,
            nonce,
            bet: params.bet,
            bomb_positions,
            opened_cells: Vec::new(),
            status: GameStatus::Active,
            payout_multiplier: None,
            finished_at: None,
        };

        self.store.append(&game).await.map_err(|e| {
            error!(game_id = %game.id, nonce, "Failed to persist new game: {}", e);
            e
        })?;

        if let Some(metrics) = &self.metrics {
            metrics.games_started.inc();
            if game.seed_origin == SeedOrigin::Fallback {
                metrics.entropy_fallbacks.inc();
            }
        }

        info!(
            game_id = %game.id,
            nonce,
            size = game.size,
            bombs = game.bomb_count,
            seed_origin = ?game.seed_origin,
            "Game started"
        );

        Ok(StartOutcome {
            game_id: game.id,
            server_seed_public: game
                .is_disclosable(self.settings.disclosure)
                .then(|| game.server_seed.clone()),
            server_seed_hash: game.server_seed_hash(),
            nonce,
        })
    }

    /// Open one cell of an active game
    pub async fn reveal(&self, game_id: Uuid, index: i64) -> MinesResult<RevealOutcome> {
        let house_edge = self.settings.house_edge;
        let (game, step) = self
            .mutate(game_id, |game| game.reveal(index, house_edge))
            .await?;

        if let Some(metrics) = &self.metrics {
            metrics.cells_revealed.inc();
            if step.is_bomb {
                metrics.bombs_hit.inc();
            }
        }

        debug!(
            game_id = %game_id,
            index,
            is_bomb = step.is_bomb,
            multiplier = step.multiplier,
            "Cell revealed"
        );

        Ok(RevealOutcome {
            is_bomb: step.is_bomb,
            opened_cells: game.opened_cells.clone(),
            multiplier: step.multiplier,
            game: game.view(self.settings.disclosure),
        })
    }

    /// Settle an active game at its current multiplier
    pub async fn cashout(&self, game_id: Uuid) -> MinesResult<CashoutOutcome> {
        let house_edge = self.settings.house_edge;
        let (game, multiplier) = self
            .mutate(game_id, |game| game.cash_out(house_edge))
            .await?;

        if let Some(metrics) = &self.metrics {
            metrics.cashouts.inc();
        }

        info!(
            game_id = %game_id,
            opened = game.opened_cells.len(),
            multiplier,
            "Game cashed out"
        );

        Ok(CashoutOutcome {
            payout_multiplier: multiplier,
            game: game.view(self.settings.disclosure),
        })
    }

    /// Disclosure record for verification, finished or not
    pub async fn verify(&self, game_id: Uuid) -> MinesResult<GameDisclosure> {
        let game = self
            .store
            .get(game_id)
            .await?
            .ok_or_else(|| self.rejected(GameError::NotFound(game_id)))?;

        Ok(game.disclosure(self.settings.disclosure))
    }

    /// Most recent games first. `limit` is capped at the configured maximum.
    pub async fn history(&self, limit: Option<usize>) -> MinesResult<Vec<GameSummary>> {
        let max = self.settings.history_limit;
        let limit = limit.unwrap_or(max).min(max);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let games = self.store.list(limit).await?;
        Ok(games.iter().map(Game::summary).collect())
    }

    /// Load, transition and persist one game under its lock. The stored
    /// record is untouched when the transition or the write fails.
    async fn mutate<T, F>(&self, game_id: Uuid, transition: F) -> MinesResult<(Game, T)>
    where
        F: FnOnce(&mut Game) -> Result<T, GameError>,
    {
        // Games are never deleted, so a miss here is final
        if self.store.get(game_id).await?.is_none() {
            return Err(self.rejected(GameError::NotFound(game_id)));
        }

        let lock = self.lock_for(game_id);
        let result = {
            let _guard = lock.lock().await;
            self.apply(game_id, transition).await
        };
        self.release_lock(game_id, &lock);

        result
    }

    async fn apply<T, F>(&self, game_id: Uuid, transition: F) -> MinesResult<(Game, T)>
    where
        F: FnOnce(&mut Game) -> Result<T, GameError>,
    {
        let mut game = self
            .store
            .get(game_id)
            .await?
            .ok_or_else(|| self.rejected(GameError::NotFound(game_id)))?;

        let value = transition(&mut game).map_err(|e| self.rejected(e))?;

        self.store.update(&game).await.map_err(|e| {
            error!(game_id = %game_id, "Failed to persist game update: {}", e);
            e
        })?;

        Ok((game, value))
    }

    fn lock_for(&self, game_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(game_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the map entry once no other request holds or awaits it.
    /// The shard lock taken by `remove_if` keeps `lock_for` from cloning
    /// the entry while the count is checked.
    fn release_lock(&self, game_id: Uuid, lock: &Arc<Mutex<()>>) {
        self.locks.remove_if(&game_id, |_, held| {
            Arc::ptr_eq(held, lock) && Arc::strong_count(held) == 2
        });
    }

    fn rejected(&self, error: GameError) -> MinesError {
        debug!("Rejected operation: {}", error);
        if let Some(metrics) = &self.metrics {
            metrics.record_rejection(error.code());
        }
        MinesError::Game(error)
    }
}
