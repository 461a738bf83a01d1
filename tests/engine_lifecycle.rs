//! End-to-end game lifecycle over the in-memory store

use async_trait::async_trait;
use mines::{
    entropy::{EntropyError, EntropyProvider, StaticProvider, FALLBACK_PREFIX},
    errors::{GameError, MinesError, MinesResult, StorageError},
    game_store::{GameStore, MemoryGameStore},
    games::{
        compute_multiplier, generate_bomb_positions, EngineSettings, Game, GameResult, MinesEngine,
        SeedOrigin, StartRequest, LAYOUT_ALGORITHM,
    },
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use uuid::Uuid;

fn settings() -> EngineSettings {
    EngineSettings {
        seed_suffix: String::new(),
        ..EngineSettings::default()
    }
}

fn engine_with_store(store: Arc<dyn GameStore>) -> Arc<MinesEngine> {
    Arc::new(MinesEngine::new(
        store,
        Arc::new(StaticProvider::new("seed123")),
        settings(),
    ))
}

fn engine() -> Arc<MinesEngine> {
    engine_with_store(Arc::new(MemoryGameStore::new()))
}

fn request(size: i64, bombs: i64, client_seed: &str) -> StartRequest {
    StartRequest {
        size,
        bomb_count: bombs,
        client_seed: client_seed.to_string(),
        bet: None,
    }
}

#[tokio::test]
async fn scenario_a_multipliers() {
    assert_eq!(compute_multiplier(16, 3, 0), 1.0);
    assert_eq!(compute_multiplier(16, 3, 1), 1.206154);
}

#[tokio::test]
async fn scenario_b_fixed_seed_layout_is_stable() {
    for _ in 0..3 {
        let engine = engine();
        let started = engine.start(request(4, 3, "abc")).await.unwrap();
        assert_eq!(started.nonce, 1);

        let record = engine.verify(started.game_id).await.unwrap();
        assert_eq!(record.bomb_positions, Some(vec![3, 9, 10]));
        assert_eq!(record.algorithm, LAYOUT_ALGORITHM);
        assert_eq!(record.seed_origin, SeedOrigin::Public);
    }
}

#[tokio::test]
async fn scenario_c_bomb_loses_game() {
    let engine = engine();
    let id = engine.start(request(4, 3, "abc")).await.unwrap().game_id;

    engine.reveal(id, 1).await.unwrap();
    let hit = engine.reveal(id, 3).await.unwrap();
    assert!(hit.is_bomb);
    assert_eq!(hit.multiplier, 0.0);
    assert_eq!(hit.opened_cells, vec![1, 3]);
    assert_eq!(hit.game.result, Some(GameResult::Lost));

    for index in [0, 3, 99] {
        match engine.reveal(id, index).await {
            Err(MinesError::Game(GameError::AlreadyFinished(game))) => assert_eq!(game, id),
            other => panic!("expected AlreadyFinished, got {:?}", other),
        }
    }
    assert_eq!(engine.verify(id).await.unwrap().opened_cells, vec![1, 3]);
}

#[tokio::test]
async fn scenario_d_full_clear_then_cashout() {
    let engine = engine();
    let id = engine.start(request(5, 5, "abc")).await.unwrap().game_id;
    let bombs = generate_bomb_positions("seed123", "abc", 1, 25, 5);

    let mut last = 1.0;
    for cell in (0..25).filter(|c| !bombs.contains(c)) {
        let step = engine.reveal(id, i64::from(cell)).await.unwrap();
        assert!(!step.is_bomb);
        assert!(step.multiplier > last);
        last = step.multiplier;
    }

    let cashed = engine.cashout(id).await.unwrap();
    assert_eq!(cashed.payout_multiplier, compute_multiplier(25, 5, 20));
    assert_eq!(cashed.game.result, Some(GameResult::Cashed));
    assert_eq!(cashed.game.bomb_positions, Some(bombs));
}

#[tokio::test]
async fn concurrent_reveals_of_one_cell_succeed_once() {
    let engine = engine();
    let id = engine.start(request(5, 3, "abc")).await.unwrap().game_id;
    let bombs = generate_bomb_positions("seed123", "abc", 1, 25, 3);
    let cell = (0..25u32).find(|c| !bombs.contains(c)).unwrap();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move { engine.reveal(id, i64::from(cell)).await }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(MinesError::Game(GameError::AlreadyOpened(c))) => assert_eq!(c, cell),
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(engine.verify(id).await.unwrap().opened_cells, vec![cell]);
}

#[tokio::test]
async fn concurrent_reveal_and_cashout_serialize() {
    let engine = engine();
    let id = engine.start(request(5, 1, "abc")).await.unwrap().game_id;
    let bombs = generate_bomb_positions("seed123", "abc", 1, 25, 1);
    let safe: Vec<u32> = (0..25).filter(|c| !bombs.contains(c)).take(8).collect();

    let mut handles = Vec::new();
    for &cell in &safe {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.reveal(id, i64::from(cell)).await.map(|_| ())
        }));
    }
    let cashout = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.cashout(id).await })
    };

    for handle in handles {
        let _ = handle.await.unwrap();
    }
    let payout = cashout.await.unwrap().unwrap().payout_multiplier;

    // Cashout settles on exactly the reveals that landed before it
    let record = engine.verify(id).await.unwrap();
    let opened = record.opened_cells.len() as u32;
    assert_eq!(payout, compute_multiplier(25, 1, opened));
    assert_eq!(record.payout_multiplier, Some(payout));
}

#[tokio::test]
async fn games_are_independent() {
    let engine = engine();
    let a = engine.start(request(4, 3, "abc")).await.unwrap().game_id;
    let b = engine.start(request(4, 3, "abc")).await.unwrap().game_id;

    engine.cashout(a).await.unwrap();
    let step = engine.reveal(b, 0).await.unwrap();
    assert!(!step.game.finished);
    assert_eq!(engine.history(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_game_is_not_found() {
    let engine = engine();
    let id = Uuid::new_v4();
    assert!(matches!(
        engine.reveal(id, 0).await,
        Err(MinesError::Game(GameError::NotFound(_)))
    ));
}

struct FailingProvider;

#[async_trait]
impl EntropyProvider for FailingProvider {
    async fn fetch(&self) -> Result<String, EntropyError> {
        Err(EntropyError::Request("connection refused".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

struct StalledProvider;

#[async_trait]
impl EntropyProvider for StalledProvider {
    async fn fetch(&self) -> Result<String, EntropyError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("late".to_string())
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

#[tokio::test]
async fn entropy_failures_fall_back() {
    let providers: Vec<Arc<dyn EntropyProvider>> = vec![Arc::new(FailingProvider), Arc::new(StalledProvider)];

    for provider in providers {
        let engine = MinesEngine::new(
            Arc::new(MemoryGameStore::new()),
            provider,
            EngineSettings {
                entropy_timeout: Duration::from_millis(50),
                ..settings()
            },
        );

        let started = engine.start(request(4, 3, "abc")).await.unwrap();
        let seed = started.server_seed_public.unwrap();
        assert!(seed.starts_with(FALLBACK_PREFIX));

        let record = engine.verify(started.game_id).await.unwrap();
        assert_eq!(record.seed_origin, SeedOrigin::Fallback);
        assert_eq!(
            record.bomb_positions,
            Some(generate_bomb_positions(&seed, "abc", started.nonce, 16, 3))
        );
    }
}

/// Delegates to a memory store but can be told to fail writes
struct FlakyStore {
    inner: MemoryGameStore,
    fail_updates: AtomicBool,
}

#[async_trait]
impl GameStore for FlakyStore {
    async fn get(&self, id: Uuid) -> MinesResult<Option<Game>> {
        self.inner.get(id).await
    }

    async fn append(&self, game: &Game) -> MinesResult<()> {
        self.inner.append(game).await
    }

    async fn update(&self, game: &Game) -> MinesResult<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFailed("disk full".to_string()).into());
        }
        self.inner.update(game).await
    }

    async fn list(&self, limit: usize) -> MinesResult<Vec<Game>> {
        self.inner.list(limit).await
    }

    async fn next_nonce(&self) -> MinesResult<u64> {
        self.inner.next_nonce().await
    }
}

#[tokio::test]
async fn store_failure_leaves_game_untouched() {
    let store = Arc::new(FlakyStore {
        inner: MemoryGameStore::new(),
        fail_updates: AtomicBool::new(false),
    });
    let engine = engine_with_store(store.clone());
    let id = engine.start(request(4, 3, "abc")).await.unwrap().game_id;
    engine.reveal(id, 0).await.unwrap();

    store.fail_updates.store(true, Ordering::SeqCst);
    assert!(matches!(engine.reveal(id, 1).await, Err(MinesError::Storage(_))));
    assert!(matches!(engine.cashout(id).await, Err(MinesError::Storage(_))));

    let record = engine.verify(id).await.unwrap();
    assert_eq!(record.opened_cells, vec![0]);
    assert!(!record.finished);

    store.fail_updates.store(false, Ordering::SeqCst);
    assert_eq!(engine.reveal(id, 1).await.unwrap().opened_cells, vec![0, 1]);
}
