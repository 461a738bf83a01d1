use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{layout::LAYOUT_ALGORITHM, payout, rng};
use crate::errors::GameError;

/// Lifecycle state of a game. `Lost` and `Cashed` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Lost,
    Cashed,
}

impl GameStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, GameStatus::Active)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Active => write!(f, "active"),
            GameStatus::Lost => write!(f, "lost"),
            GameStatus::Cashed => write!(f, "cashed"),
        }
    }
}

/// Terminal result as reported to clients (`null` while active)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Lost,
    Cashed,
}

/// Where the server seed came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeedOrigin {
    /// Public entropy provider (e.g. a block id)
    Public,
    /// Local fallback after provider timeout or failure
    Fallback,
}

/// When the server seed and bomb positions become visible
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisclosurePolicy {
    /// Server seed returned at start, layout verifiable at any time
    #[default]
    Immediate,
    /// Only the seed hash is published until the game finishes
    OnFinish,
}

/// Validated start parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GameParams {
    pub size: u32,
    pub bomb_count: u32,
    pub client_seed: String,
    pub bet: f64,
}

impl GameParams {
    /// Validate raw input. Nothing is created when this fails.
    pub fn validate(
        size: i64,
        bomb_count: i64,
        client_seed: &str,
        bet: Option<f64>,
        max_size: u32,
    ) -> Result<Self, GameError> {
        if size <= 0 {
            return Err(GameError::InvalidParameters(format!(
                "grid size must be positive, got {}",
                size
            )));
        }
        if size > i64::from(max_size) {
            return Err(GameError::InvalidParameters(format!(
                "grid size {} exceeds maximum {}",
                size, max_size
            )));
        }

        let too_large = || GameError::InvalidParameters(format!("grid size {} is too large", size));
        let size = u32::try_from(size).map_err(|_| too_large())?;
        let total_cells = size.checked_mul(size).ok_or_else(too_large)?;
        if bomb_count < 1 || bomb_count >= i64::from(total_cells) {
            return Err(GameError::InvalidParameters(format!(
                "bomb count must be in [1, {}], got {}",
                i64::from(total_cells) - 1,
                bomb_count
            )));
        }

        if client_seed.trim().is_empty() {
            return Err(GameError::InvalidParameters("client seed is required".to_string()));
        }

        let bet = bet.unwrap_or(0.0);
        if !bet.is_finite() || bet < 0.0 {
            return Err(GameError::InvalidParameters(format!(
                "bet must be a non-negative number, got {}",
                bet
            )));
        }

        Ok(Self {
            size,
            bomb_count: bomb_count as u32,
            client_seed: client_seed.to_string(),
            bet,
        })
    }
}

/// Persisted game record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub size: u32,
    pub bomb_count: u32,
    pub total_cells: u32,
    pub client_seed: String,
    pub server_seed: String,
    pub seed_origin: SeedOrigin,
    pub nonce: u64,
    pub bet: f64,
    pub bomb_positions: Vec<u32>,
    pub opened_cells: Vec<u32>,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Effect of a successful reveal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevealStep {
    pub is_bomb: bool,
    pub multiplier: f64,
}

impl Game {
    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn result(&self) -> Option<GameResult> {
        match self.status {
            GameStatus::Active => None,
            GameStatus::Lost => Some(GameResult::Lost),
            GameStatus::Cashed => Some(GameResult::Cashed),
        }
    }

    pub fn is_bomb(&self, index: u32) -> bool {
        self.bomb_positions.binary_search(&index).is_ok()
    }

    /// Open one cell. Checks run in order: finished, index range, duplicate.
    /// On error the record is left untouched.
    pub fn reveal(&mut self, index: i64, house_edge: f64) -> Result<RevealStep, GameError> {
        if self.is_finished() {
            return Err(GameError::AlreadyFinished(self.id));
        }

        let cell = u32::try_from(index)
            .ok()
            .filter(|&c| c < self.total_cells)
            .ok_or(GameError::InvalidIndex {
                index,
                total_cells: self.total_cells,
            })?;

        if self.opened_cells.contains(&cell) {
            return Err(GameError::AlreadyOpened(cell));
        }

        self.opened_cells.push(cell);

        if self.is_bomb(cell) {
            self.status = GameStatus::Lost;
            self.finished_at = Some(Utc::now());
            return Ok(RevealStep {
                is_bomb: true,
                multiplier: 0.0,
            });
        }

        // Clearing every safe cell does not settle the game; cashout is explicit.
        let multiplier = payout::compute_multiplier_with_edge(
            self.total_cells,
            self.bomb_count,
            self.opened_cells.len() as u32,
            house_edge,
        );

        Ok(RevealStep {
            is_bomb: false,
            multiplier,
        })
    }

    /// Settle the game at the multiplier for the cells opened so far
    pub fn cash_out(&mut self, house_edge: f64) -> Result<f64, GameError> {
        if self.is_finished() {
            return Err(GameError::AlreadyFinished(self.id));
        }

        let multiplier = payout::compute_multiplier_with_edge(
            self.total_cells,
            self.bomb_count,
            self.opened_cells.len() as u32,
            house_edge,
        );

        self.status = GameStatus::Cashed;
        self.payout_multiplier = Some(multiplier);
        self.finished_at = Some(Utc::now());
        Ok(multiplier)
    }

    pub fn server_seed_hash(&self) -> String {
        rng::server_seed_hash(&self.server_seed)
    }

    /// Whether seeds and layout may be shown under `policy`
    pub fn is_disclosable(&self, policy: DisclosurePolicy) -> bool {
        match policy {
            DisclosurePolicy::Immediate => true,
            DisclosurePolicy::OnFinish => self.is_finished(),
        }
    }

    pub fn summary(&self) -> GameSummary {
        GameSummary {
            id: self.id,
            created_at: self.created_at,
            size: self.size,
            bomb_count: self.bomb_count,
            bet: self.bet,
            result: self.result(),
            nonce: self.nonce,
        }
    }

    /// Player-facing view; hidden fields follow the disclosure policy
    pub fn view(&self, policy: DisclosurePolicy) -> GameView {
        let bombs_visible = self.is_finished();
        GameView {
            id: self.id,
            created_at: self.created_at,
            size: self.size,
            bomb_count: self.bomb_count,
            total_cells: self.total_cells,
            client_seed: self.client_seed.clone(),
            server_seed: self
                .is_disclosable(policy)
                .then(|| self.server_seed.clone()),
            server_seed_hash: self.server_seed_hash(),
            nonce: self.nonce,
            bet: self.bet,
            bomb_positions: bombs_visible.then(|| self.bomb_positions.clone()),
            opened_cells: self.opened_cells.clone(),
            finished: self.is_finished(),
            result: self.result(),
            payout_multiplier: self.payout_multiplier,
        }
    }

    /// Full verification record; hidden fields follow the disclosure policy
    pub fn disclosure(&self, policy: DisclosurePolicy) -> GameDisclosure {
        let visible = self.is_disclosable(policy);
        GameDisclosure {
            id: self.id,
            created_at: self.created_at,
            size: self.size,
            bomb_count: self.bomb_count,
            total_cells: self.total_cells,
            client_seed: self.client_seed.clone(),
            server_seed: visible.then(|| self.server_seed.clone()),
            server_seed_hash: self.server_seed_hash(),
            seed_origin: self.seed_origin,
            nonce: self.nonce,
            bet: self.bet,
            bomb_positions: visible.then(|| self.bomb_positions.clone()),
            opened_cells: self.opened_cells.clone(),
            finished: self.is_finished(),
            result: self.result(),
            payout_multiplier: self.payout_multiplier,
            algorithm: LAYOUT_ALGORITHM.to_string(),
        }
    }
}

/// History entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub size: u32,
    pub bomb_count: u32,
    pub bet: f64,
    pub result: Option<GameResult>,
    pub nonce: u64,
}

/// Game state returned alongside reveal and cashout responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub size: u32,
    pub bomb_count: u32,
    pub total_cells: u32,
    pub client_seed: String,
    pub server_seed: Option<String>,
    pub server_seed_hash: String,
    pub nonce: u64,
    pub bet: f64,
    pub bomb_positions: Option<Vec<u32>>,
    pub opened_cells: Vec<u32>,
    pub finished: bool,
    pub result: Option<GameResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_multiplier: Option<f64>,
}

/// Everything a third party needs to recompute a game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameDisclosure {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub size: u32,
    pub bomb_count: u32,
    pub total_cells: u32,
    pub client_seed: String,
    pub server_seed: Option<String>,
    pub server_seed_hash: String,
    pub seed_origin: SeedOrigin,
    pub nonce: u64,
    pub bet: f64,
    pub bomb_positions: Option<Vec<u32>>,
    pub opened_cells: Vec<u32>,
    pub finished: bool,
    pub result: Option<GameResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_multiplier: Option<f64>,
    pub algorithm: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::layout::generate_bomb_positions;

    fn fixture_game() -> Game {
        Game {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            size: 4,
            bomb_count: 3,
            total_cells: 16,
            client_seed: "abc".to_string(),
            server_seed: "seed123".to_string(),
            seed_origin: SeedOrigin::Public,
            nonce: 1,
            bet: 1.5,
            bomb_positions: generate_bomb_positions("seed123", "abc", 1, 16, 3),
            opened_cells: vec![],
            status: GameStatus::Active,
            payout_multiplier: None,
            finished_at: None,
        }
    }

    #[test]
    fn test_validate_params() {
        assert!(GameParams::validate(4, 3, "abc", None, 32).is_ok());
        assert!(GameParams::validate(1, 1, "abc", None, 32).is_err());
        assert!(GameParams::validate(0, 1, "abc", None, 32).is_err());
        assert!(GameParams::validate(-3, 1, "abc", None, 32).is_err());
        assert!(GameParams::validate(4, 0, "abc", None, 32).is_err());
        assert!(GameParams::validate(4, 16, "abc", None, 32).is_err());
        assert!(GameParams::validate(4, 15, "abc", None, 32).is_ok());
        assert!(GameParams::validate(4, 3, "  ", None, 32).is_err());
        assert!(GameParams::validate(4, 3, "abc", Some(-1.0), 32).is_err());
        assert!(GameParams::validate(4, 3, "abc", Some(f64::NAN), 32).is_err());
        assert!(GameParams::validate(33, 3, "abc", None, 32).is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_grid() {
        let err = GameParams::validate(70_000, 1, "abc", None, u32::MAX).unwrap_err();
        assert!(matches!(err, GameError::InvalidParameters(_)));

        let err = GameParams::validate(i64::from(u32::MAX) + 1, 1, "abc", None, u32::MAX).unwrap_err();
        assert!(matches!(err, GameError::InvalidParameters(_)));

        let params = GameParams::validate(256, 1, "abc", None, 256).unwrap();
        assert_eq!(params.size, 256);
    }

    #[test]
    fn test_reveal_safe_then_duplicate() {
        let mut game = fixture_game();

        let step = game.reveal(0, 0.98).unwrap();
        assert!(!step.is_bomb);
        assert_eq!(step.multiplier, 1.206154);
        assert_eq!(game.opened_cells, vec![0]);

        assert_eq!(game.reveal(0, 0.98), Err(GameError::AlreadyOpened(0)));
        assert_eq!(game.opened_cells, vec![0]);
    }

    #[test]
    fn test_reveal_invalid_index() {
        let mut game = fixture_game();

        assert!(matches!(game.reveal(-1, 0.98), Err(GameError::InvalidIndex { .. })));
        assert!(matches!(game.reveal(16, 0.98), Err(GameError::InvalidIndex { .. })));
        assert!(game.opened_cells.is_empty());
    }

    #[test]
    fn test_reveal_bomb_finishes_game() {
        let mut game = fixture_game();

        let step = game.reveal(9, 0.98).unwrap();
        assert!(step.is_bomb);
        assert_eq!(step.multiplier, 0.0);
        assert_eq!(game.status, GameStatus::Lost);
        assert_eq!(game.result(), Some(GameResult::Lost));
        assert_eq!(game.opened_cells, vec![9]);

        let before = game.clone();
        assert_eq!(game.reveal(0, 0.98), Err(GameError::AlreadyFinished(game.id)));
        assert_eq!(game.cash_out(0.98), Err(GameError::AlreadyFinished(game.id)));
        assert_eq!(game, before);
    }

    #[test]
    fn test_clearing_board_keeps_game_open() {
        let mut game = fixture_game();
        for cell in (0..16).filter(|c| ![3, 9, 10].contains(c)) {
            game.reveal(cell, 0.98).unwrap();
        }

        assert_eq!(game.status, GameStatus::Active);
        assert_eq!(game.cash_out(0.98), Ok(548.8));
        assert_eq!(game.payout_multiplier, Some(548.8));
    }

    #[test]
    fn test_cash_out_without_reveals() {
        let mut game = fixture_game();
        assert_eq!(game.cash_out(0.98), Ok(1.0));
        assert_eq!(game.result(), Some(GameResult::Cashed));
    }

    #[test]
    fn test_disclosure_policy() {
        let mut game = fixture_game();

        let open = game.disclosure(DisclosurePolicy::Immediate);
        assert_eq!(open.server_seed.as_deref(), Some("seed123"));
        assert_eq!(open.bomb_positions, Some(vec![3, 9, 10]));

        let hidden = game.disclosure(DisclosurePolicy::OnFinish);
        assert!(hidden.server_seed.is_none());
        assert!(hidden.bomb_positions.is_none());
        assert_eq!(hidden.server_seed_hash, rng::server_seed_hash("seed123"));

        assert!(game.view(DisclosurePolicy::Immediate).bomb_positions.is_none());

        game.cash_out(0.98).unwrap();
        let revealed = game.disclosure(DisclosurePolicy::OnFinish);
        assert_eq!(revealed.server_seed.as_deref(), Some("seed123"));
        assert_eq!(revealed.bomb_positions, Some(vec![3, 9, 10]));
        assert!(game.view(DisclosurePolicy::OnFinish).bomb_positions.is_some());
    }

    #[test]
    fn test_record_json_shape() {
        let game = fixture_game();
        let value = serde_json::to_value(&game).unwrap();

        assert_eq!(value["bombCount"], 3);
        assert_eq!(value["status"], "active");
        assert_eq!(value["seedOrigin"], "public");
        assert!(value.get("payoutMultiplier").is_none());

        let summary = serde_json::to_value(game.summary()).unwrap();
        assert!(summary["result"].is_null());
    }
}
