use std::{collections::HashMap, sync::Arc};

use shared::{
    domain::{Game, GameId, Mark, Player},
    error::GameError,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Per-game lock. Every mutation of one game happens while holding it.
pub type GameHandle = Arc<Mutex<Game>>;

/// In-memory owner of every live game, keyed by id.
///
/// The map lock only guards membership and is never held while waiting on a
/// game's lock, so slow work on one game cannot stall lookups of another.
#[derive(Clone, Default)]
pub struct GameRegistry {
    inner: Arc<RwLock<Entries>>,
}

#[derive(Default)]
struct Entries {
    next_seq: u64,
    games: HashMap<GameId, Entry>,
}

struct Entry {
    seq: u64,
    game: GameHandle,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, player_name: &str) -> Result<Game, GameError> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(GameError::MissingPlayerName);
        }

        let game = Game::new(GameId::generate(), Player::new(player_name, Mark::X));
        let mut entries = self.inner.write().await;
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.games.insert(
            game.id.clone(),
            Entry {
                seq,
                game: Arc::new(Mutex::new(game.clone())),
            },
        );
        info!(game_id = %game.id, player = player_name, "game created");
        Ok(game)
    }

    pub async fn handle(&self, game_id: &GameId) -> Option<GameHandle> {
        let entries = self.inner.read().await;
        entries.games.get(game_id).map(|entry| entry.game.clone())
    }

    pub async fn get(&self, game_id: &GameId) -> Option<Game> {
        let Some(handle) = self.handle(game_id).await else {
            warn!(%game_id, "game not found");
            return None;
        };
        let game = handle.lock().await.clone();
        Some(game)
    }

    /// Snapshot of every game in creation order.
    pub async fn list_all(&self) -> Vec<Game> {
        let mut handles: Vec<(u64, GameHandle)> = {
            let entries = self.inner.read().await;
            entries
                .games
                .values()
                .map(|entry| (entry.seq, entry.game.clone()))
                .collect()
        };
        handles.sort_by_key(|(seq, _)| *seq);

        let mut games = Vec::with_capacity(handles.len());
        for (_, handle) in handles {
            games.push(handle.lock().await.clone());
        }
        games
    }

    /// Returns whether a game was removed. Unknown ids are a logged no-op.
    pub async fn remove(&self, game_id: &GameId) -> bool {
        let removed = self.inner.write().await.games.remove(game_id).is_some();
        if removed {
            info!(%game_id, "game ended and removed");
        } else {
            warn!(%game_id, "attempted to remove non-existent game");
        }
        removed
    }

    pub async fn contains(&self, game_id: &GameId) -> bool {
        self.inner.read().await.games.contains_key(game_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.games.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
