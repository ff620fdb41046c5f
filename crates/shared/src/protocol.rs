use serde::{Deserialize, Serialize};

use crate::{
    domain::{Game, GameId},
    error::ApiError,
};

/// Frames a realtime client may send over the socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientRequest {
    JoinGame { game_id: GameId },
    LeaveGame { game_id: GameId },
    MakeMove { game_id: GameId, index: usize },
    EndGame { game_id: GameId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreateGameRequest {
    Named {
        #[serde(rename = "playerName")]
        player_name: String,
    },
    Bare(String),
}

impl CreateGameRequest {
    pub fn player_name(&self) -> &str {
        match self {
            CreateGameRequest::Named { player_name } => player_name,
            CreateGameRequest::Bare(name) => name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEndedResponse {
    pub game_id: GameId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    GameCreated { game: Game },
    ReceiveGameUpdate { game: Game },
    GameEnded { game_id: GameId },
    Error(ApiError),
}
