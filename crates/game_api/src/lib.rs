use std::sync::Arc;

use registry::{GameHandle, GameRegistry};
use shared::{
    domain::{Game, GameId},
    error::GameError,
    rules::Outcome,
};
use tokio::sync::MutexGuard;
use tracing::{debug, info, warn};

mod moves;
mod opponent;

pub use moves::place_mark;
pub use opponent::{choose_move, OpponentConfig};

/// Receives every state change the orchestrator commits.
///
/// Per-game notifications are emitted while that game's lock is held, so an
/// implementation must not block and must not call back into the orchestrator.
pub trait EventSink: Send + Sync {
    fn publish_game_created(&self, game: &Game);
    fn publish_game_update(&self, game: &Game);
    fn publish_game_ended(&self, game_id: &GameId);
}

#[derive(Clone)]
pub struct GameContext {
    pub registry: GameRegistry,
    pub events: Arc<dyn EventSink>,
    pub opponent: OpponentConfig,
}

impl GameContext {
    pub fn new(registry: GameRegistry, events: Arc<dyn EventSink>, opponent: OpponentConfig) -> Self {
        Self {
            registry,
            events,
            opponent,
        }
    }
}

pub async fn create_game(ctx: &GameContext, player_name: &str) -> Result<Game, GameError> {
    let game = ctx.registry.create(player_name).await?;
    ctx.events.publish_game_created(&game);
    Ok(game)
}

pub async fn get_game(ctx: &GameContext, game_id: &GameId) -> Result<Game, GameError> {
    ctx.registry
        .get(game_id)
        .await
        .ok_or_else(|| GameError::NotFound(game_id.clone()))
}

pub async fn list_games(ctx: &GameContext) -> Vec<Game> {
    ctx.registry.list_all().await
}

/// Hands the current state to `on_join` under the game's lock, so the joining
/// client sees the snapshot before any later update.
pub async fn join_game<F>(ctx: &GameContext, game_id: &GameId, on_join: F) -> Result<Game, GameError>
where
    F: FnOnce(&Game),
{
    let handle = resolve(ctx, game_id).await?;
    let game = lock_live(ctx, game_id, &handle).await?;
    on_join(&game);
    Ok(game.clone())
}

/// Applies the human player's move and, when the turn passes to the computer,
/// waits for its reply. Returns the state after both have been committed.
pub async fn make_move(ctx: &GameContext, game_id: &GameId, index: usize) -> Result<Game, GameError> {
    let handle = resolve(ctx, game_id).await?;

    let computer_turn = {
        let mut game = lock_live(ctx, game_id, &handle).await?;
        moves::validate_human_move(&game, index)?;
        match place_mark(&mut game, index) {
            Outcome::Won => info!(%game_id, player = %game.player1.name, "player won"),
            Outcome::Tie => info!(%game_id, "game ended in a tie"),
            Outcome::Continue => {}
        }
        ctx.events.publish_game_update(&game);
        game.is_computer_turn()
    };

    if computer_turn {
        if let Err(error) = opponent::play_computer_turn(ctx, game_id).await {
            warn!(%game_id, %error, "computer move skipped");
        }
    }

    let game = handle.lock().await.clone();
    Ok(game)
}

pub async fn end_game(ctx: &GameContext, game_id: &GameId) -> Result<(), GameError> {
    let handle = resolve(ctx, game_id).await?;

    // Wait out any in-flight mutation so the end event is the group's last.
    let _game = handle.lock().await;
    if !ctx.registry.remove(game_id).await {
        return Err(GameError::NotFound(game_id.clone()));
    }
    ctx.events.publish_game_ended(game_id);
    Ok(())
}

async fn resolve(ctx: &GameContext, game_id: &GameId) -> Result<GameHandle, GameError> {
    ctx.registry
        .handle(game_id)
        .await
        .ok_or_else(|| GameError::NotFound(game_id.clone()))
}

/// Locks `handle` and confirms the game was not removed while we waited.
/// `end_game` removes under the same lock, so a caller that gets the guard
/// back is ordered before the end event.
pub(crate) async fn lock_live<'a>(
    ctx: &GameContext,
    game_id: &GameId,
    handle: &'a GameHandle,
) -> Result<MutexGuard<'a, Game>, GameError> {
    let game = handle.lock().await;
    if !ctx.registry.contains(game_id).await {
        debug!(%game_id, "game removed while waiting for its lock");
        return Err(GameError::NotFound(game_id.clone()));
    }
    Ok(game)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
