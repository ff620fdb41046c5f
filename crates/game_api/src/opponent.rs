use std::time::Duration;

use rand::Rng;
use shared::{
    domain::{Cells, GameId, Mark},
    error::GameError,
    rules::{self, Outcome},
};
use tracing::{debug, info};

use crate::{lock_live, moves::place_mark, GameContext};

/// How long the computer pretends to think before replying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpponentConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1300,
            max_delay_ms: 3500,
        }
    }
}

impl OpponentConfig {
    pub fn instant() -> Self {
        Self {
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn thinking_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let millis = if self.min_delay_ms >= self.max_delay_ms {
            self.min_delay_ms
        } else {
            rng.random_range(self.min_delay_ms..=self.max_delay_ms)
        };
        Duration::from_millis(millis)
    }
}

/// Win if possible, otherwise block, otherwise any empty cell.
pub fn choose_move<R: Rng + ?Sized>(cells: &Cells, own: Mark, opponent: Mark, rng: &mut R) -> Option<usize> {
    if let Some(index) = rules::find_best_move(cells, own) {
        return Some(index);
    }
    if let Some(index) = rules::find_best_move(cells, opponent) {
        return Some(index);
    }
    let empty = rules::empty_cells(cells);
    if empty.is_empty() {
        return None;
    }
    Some(empty[rng.random_range(0..empty.len())])
}

/// Sleeps without holding any lock, then re-resolves the game and plays only
/// if it still exists and is still waiting on the computer.
pub(crate) async fn play_computer_turn(ctx: &GameContext, game_id: &GameId) -> Result<(), GameError> {
    let delay = ctx.opponent.thinking_time(&mut rand::rng());
    debug!(%game_id, delay_ms = delay.as_millis() as u64, "computer thinking");
    tokio::time::sleep(delay).await;

    let Some(handle) = ctx.registry.handle(game_id).await else {
        info!(%game_id, "game ended while computer was thinking");
        return Ok(());
    };
    let mut game = match lock_live(ctx, game_id, &handle).await {
        Ok(game) => game,
        Err(_) => {
            info!(%game_id, "game ended while computer was waiting to move");
            return Ok(());
        }
    };
    if !game.is_computer_turn() {
        debug!(%game_id, "computer turn no longer pending");
        return Ok(());
    }

    let index = choose_move(&game.board.cells, game.player2.mark, game.player1.mark, &mut rand::rng())
        .ok_or(GameError::NoEmptyCell)?;
    match place_mark(&mut game, index) {
        Outcome::Won => info!(%game_id, "computer won"),
        Outcome::Tie => info!(%game_id, "game ended in a tie"),
        Outcome::Continue => debug!(%game_id, index, "computer moved"),
    }
    ctx.events.publish_game_update(&game);
    Ok(())
}
