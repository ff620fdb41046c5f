use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::GameId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    InvalidMove,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Everything the registry and orchestrator can reject.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("player name is required")]
    MissingPlayerName,
    #[error("game {0} not found")]
    NotFound(GameId),
    #[error("game {0} is already over")]
    GameFinished(GameId),
    #[error("cell {0} is outside the board")]
    OutOfRange(usize),
    #[error("cell {0} is already occupied")]
    CellOccupied(usize),
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("no empty cell left to play")]
    NoEmptyCell,
}

impl GameError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GameError::MissingPlayerName => ErrorCode::Validation,
            GameError::NotFound(_) => ErrorCode::NotFound,
            GameError::GameFinished(_)
            | GameError::OutOfRange(_)
            | GameError::CellOccupied(_)
            | GameError::NotYourTurn => ErrorCode::InvalidMove,
            GameError::NoEmptyCell => ErrorCode::Internal,
        }
    }
}

impl From<GameError> for ApiError {
    fn from(value: GameError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_rejections_map_to_invalid_move() {
        for err in [
            GameError::GameFinished(GameId::from("g")),
            GameError::OutOfRange(9),
            GameError::CellOccupied(4),
            GameError::NotYourTurn,
        ] {
            assert_eq!(ApiError::from(err).code, ErrorCode::InvalidMove);
        }
    }

    #[test]
    fn not_found_keeps_the_game_id_in_the_message() {
        let api: ApiError = GameError::NotFound(GameId::from("missing")).into();
        assert_eq!(api.code, ErrorCode::NotFound);
        assert_eq!(api.message, "game missing not found");
    }
}
