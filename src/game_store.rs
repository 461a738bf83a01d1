//! Persistent game records.
//!
//! The engine only sees the [`GameStore`] trait. Records are append-only:
//! games are updated in place but never deleted.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::RwLock;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    errors::{MinesError, MinesResult, StorageError},
    games::Game,
    storage::OptimizedStorage,
};

const GAME_RECORD_PREFIX: &str = "game:record:";
const RECENT_GAMES_PREFIX: &[u8] = b"game:index:recent:";
const NONCE_COUNTER_KEY: &[u8] = b"game:nonce:last";

/// Repository of game records
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Load one game
    async fn get(&self, id: Uuid) -> MinesResult<Option<Game>>;

    /// Insert a new game. Fails if the id already exists.
    async fn append(&self, game: &Game) -> MinesResult<()>;

    /// Replace an existing game
    async fn update(&self, game: &Game) -> MinesResult<()>;

    /// Most recent games first
    async fn list(&self, limit: usize) -> MinesResult<Vec<Game>>;

    /// Reserve the next nonce. Strictly increasing for the lifetime of the
    /// store, including across restarts for durable stores.
    async fn next_nonce(&self) -> MinesResult<u64>;
}

fn game_record_key(id: Uuid) -> Vec<u8> {
    format!("{}{}", GAME_RECORD_PREFIX, id).into_bytes()
}

fn recent_game_index_key(nonce: u64) -> Vec<u8> {
    // Newest first: inverted nonce as big-endian sort key
    let inverted = u64::MAX - nonce;
    let mut key = Vec::with_capacity(RECENT_GAMES_PREFIX.len() + 8);
    key.extend_from_slice(RECENT_GAMES_PREFIX);
    key.extend_from_slice(&inverted.to_be_bytes());
    key
}

fn parse_u64_le(bytes: &[u8]) -> Option<u64> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    Some(u64::from_le_bytes(arr))
}

fn read_failed(e: rocksdb::Error) -> MinesError {
    MinesError::Storage(StorageError::ReadFailed(e.to_string()))
}

fn write_failed(e: rocksdb::Error) -> MinesError {
    MinesError::Storage(StorageError::WriteFailed(e.to_string()))
}

/// RocksDB-backed store
pub struct RocksGameStore {
    storage: OptimizedStorage,
    last_nonce: Mutex<u64>,
}

impl RocksGameStore {
    pub fn open(storage: OptimizedStorage) -> MinesResult<Self> {
        let last_nonce = storage
            .get(NONCE_COUNTER_KEY)
            .map_err(read_failed)?
            .map(|bytes| {
                parse_u64_le(&bytes).ok_or_else(|| {
                    MinesError::Storage(StorageError::CorruptedData(
                        "Nonce counter is not 8 bytes".to_string(),
                    ))
                })
            })
            .transpose()?
            .unwrap_or(0);

        tracing::info!(last_nonce, "Opened game store");

        Ok(Self {
            storage,
            last_nonce: Mutex::new(last_nonce),
        })
    }

    fn load(&self, id: Uuid) -> MinesResult<Option<Game>> {
        let Some(bytes) = self.storage.get(&game_record_key(id)).map_err(read_failed)? else {
            return Ok(None);
        };

        let game = serde_json::from_slice(&bytes).map_err(|e| {
            MinesError::Storage(StorageError::CorruptedData(format!(
                "Failed to decode game {}: {}",
                id, e
            )))
        })?;

        Ok(Some(game))
    }

    fn encode(game: &Game) -> MinesResult<Vec<u8>> {
        serde_json::to_vec(game).map_err(|e| {
            MinesError::Storage(StorageError::WriteFailed(format!(
                "Failed to encode game {}: {}",
                game.id, e
            )))
        })
    }
}

#[async_trait]
impl GameStore for RocksGameStore {
    async fn get(&self, id: Uuid) -> MinesResult<Option<Game>> {
        self.load(id)
    }

    async fn append(&self, game: &Game) -> MinesResult<()> {
        if self.load(game.id)?.is_some() {
            return Err(MinesError::Storage(StorageError::WriteFailed(format!(
                "Game {} already exists",
                game.id
            ))));
        }

        let items = vec![
            (game_record_key(game.id), Self::encode(game)?),
            (recent_game_index_key(game.nonce), game.id.as_bytes().to_vec()),
        ];

        self.storage.batch_write(&items).map_err(write_failed)
    }

    async fn update(&self, game: &Game) -> MinesResult<()> {
        if self.load(game.id)?.is_none() {
            return Err(MinesError::Storage(StorageError::WriteFailed(format!(
                "Game {} does not exist",
                game.id
            ))));
        }

        self.storage
            .put(&game_record_key(game.id), &Self::encode(game)?)
            .map_err(write_failed)
    }

    async fn list(&self, limit: usize) -> MinesResult<Vec<Game>> {
        let rows = self
            .storage
            .scan_prefix(RECENT_GAMES_PREFIX, limit.max(1))
            .map_err(read_failed)?;

        let mut games = Vec::with_capacity(rows.len());
        for (_key, value) in rows {
            let id = Uuid::from_slice(&value).map_err(|e| {
                MinesError::Storage(StorageError::CorruptedData(format!(
                    "Invalid game id in recent index: {}",
                    e
                )))
            })?;

            match self.load(id)? {
                Some(game) => games.push(game),
                None => tracing::warn!(game_id = %id, "Recent index points at missing game"),
            }
        }

        games.truncate(limit);
        Ok(games)
    }

    async fn next_nonce(&self) -> MinesResult<u64> {
        // Held across the write so counters are persisted in order
        let mut last = self.last_nonce.lock().await;
        let next = *last + 1;
        self.storage
            .put(NONCE_COUNTER_KEY, &next.to_le_bytes())
            .map_err(write_failed)?;
        *last = next;
        Ok(next)
    }
}

/// Process-local store
#[derive(Default)]
pub struct MemoryGameStore {
    games: DashMap<Uuid, Game>,
    order: RwLock<Vec<Uuid>>,
    last_nonce: Mutex<u64>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

fn poisoned() -> MinesError {
    MinesError::Storage(StorageError::ReadFailed("game index lock poisoned".to_string()))
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn get(&self, id: Uuid) -> MinesResult<Option<Game>> {
        Ok(self.games.get(&id).map(|entry| entry.value().clone()))
    }

    async fn append(&self, game: &Game) -> MinesResult<()> {
        let mut order = self.order.write().map_err(|_| poisoned())?;
        if self.games.contains_key(&game.id) {
            return Err(MinesError::Storage(StorageError::WriteFailed(format!(
                "Game {} already exists",
                game.id
            ))));
        }
        self.games.insert(game.id, game.clone());
        order.push(game.id);
        Ok(())
    }

    async fn update(&self, game: &Game) -> MinesResult<()> {
        match self.games.get_mut(&game.id) {
            Some(mut entry) => {
                *entry = game.clone();
                Ok(())
            }
            None => Err(MinesError::Storage(StorageError::WriteFailed(format!(
                "Game {} does not exist",
                game.id
            )))),
        }
    }

    async fn list(&self, limit: usize) -> MinesResult<Vec<Game>> {
        let order = self.order.read().map_err(|_| poisoned())?;
        let mut games: Vec<Game> = order
            .iter()
            .filter_map(|id| self.games.get(id).map(|entry| entry.value().clone()))
            .collect();

        games.sort_by(|a, b| b.nonce.cmp(&a.nonce));
        games.truncate(limit);
        Ok(games)
    }

    async fn next_nonce(&self) -> MinesResult<u64> {
        let mut last = self.last_nonce.lock().await;
        *last += 1;
        Ok(*last)
    }
}
