use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const BOARD_CELLS: usize = 9;
pub const COMPUTER_NAME: &str = "Computer";
pub const TIE_NAME: &str = "Tie";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub String);

impl GameId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifies one realtime connection inside the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
    /// Placeholder carried by the tie sentinel; never placed on a board.
    #[serde(rename = "-")]
    Tie,
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Mark::X => "X",
            Mark::O => "O",
            Mark::Tie => "-",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub mark: Mark,
}

impl Player {
    pub fn new(name: impl Into<String>, mark: Mark) -> Self {
        Self {
            name: name.into(),
            mark,
        }
    }

    pub fn computer() -> Self {
        Self::new(COMPUTER_NAME, Mark::O)
    }

    /// Sentinel stored in `winner` when the game is drawn.
    pub fn tie() -> Self {
        Self::new(TIE_NAME, Mark::Tie)
    }

    pub fn is_tie(&self) -> bool {
        self.mark == Mark::Tie
    }
}

pub type Cells = [Option<Mark>; BOARD_CELLS];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub cells: Cells,
}

impl Board {
    pub fn get(&self, index: usize) -> Option<Mark> {
        self.cells.get(index).copied().flatten()
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSlot {
    Player1,
    Player2,
}

impl PlayerSlot {
    pub fn other(self) -> Self {
        match self {
            PlayerSlot::Player1 => PlayerSlot::Player2,
            PlayerSlot::Player2 => PlayerSlot::Player1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Active,
    Finished,
}

/// One game instance. `player2` is always the automated opponent and the turn
/// is tracked as a slot so it can never drift from the two players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "GameRecord", try_from = "GameRecord")]
pub struct Game {
    pub id: GameId,
    pub player1: Player,
    pub player2: Player,
    pub current: PlayerSlot,
    pub board: Board,
    pub winner: Option<Player>,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn new(id: GameId, player1: Player) -> Self {
        Self {
            id,
            player1,
            player2: Player::computer(),
            current: PlayerSlot::Player1,
            board: Board::default(),
            winner: None,
            created_at: Utc::now(),
        }
    }

    pub fn player(&self, slot: PlayerSlot) -> &Player {
        match slot {
            PlayerSlot::Player1 => &self.player1,
            PlayerSlot::Player2 => &self.player2,
        }
    }

    pub fn current_player(&self) -> &Player {
        self.player(self.current)
    }

    pub fn status(&self) -> GameStatus {
        if self.winner.is_some() {
            GameStatus::Finished
        } else {
            GameStatus::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == GameStatus::Active
    }

    pub fn is_computer_turn(&self) -> bool {
        self.is_active() && self.current == PlayerSlot::Player2
    }
}

/// Wire shape of [`Game`]: the current player travels by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: GameId,
    pub player1: Player,
    pub player2: Player,
    pub current_player: Player,
    pub board: Board,
    pub winner: Option<Player>,
    pub created_at: DateTime<Utc>,
}

impl From<Game> for GameRecord {
    fn from(game: Game) -> Self {
        let current_player = game.current_player().clone();
        Self {
            id: game.id,
            player1: game.player1,
            player2: game.player2,
            current_player,
            board: game.board,
            winner: game.winner,
            created_at: game.created_at,
        }
    }
}

#[derive(Debug, Error)]
#[error("current player {0:?} matches neither player1 nor player2")]
pub struct UnknownCurrentPlayer(pub String);

impl TryFrom<GameRecord> for Game {
    type Error = UnknownCurrentPlayer;

    fn try_from(record: GameRecord) -> Result<Self, Self::Error> {
        let current = if record.current_player == record.player1 {
            PlayerSlot::Player1
        } else if record.current_player == record.player2 {
            PlayerSlot::Player2
        } else {
            return Err(UnknownCurrentPlayer(record.current_player.name));
        };
        Ok(Self {
            id: record.id,
            player1: record.player1,
            player2: record.player2,
            current,
            board: record.board,
            winner: record.winner,
            created_at: record.created_at,
        })
    }
}
