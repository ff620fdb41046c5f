use shared::{
    domain::{Game, Player, PlayerSlot, BOARD_CELLS},
    error::GameError,
    rules::{self, Outcome},
};

pub(crate) fn validate_human_move(game: &Game, index: usize) -> Result<(), GameError> {
    if !game.is_active() {
        return Err(GameError::GameFinished(game.id.clone()));
    }
    if index >= BOARD_CELLS {
        return Err(GameError::OutOfRange(index));
    }
    if game.board.is_occupied(index) {
        return Err(GameError::CellOccupied(index));
    }
    if game.current != PlayerSlot::Player1 {
        return Err(GameError::NotYourTurn);
    }
    Ok(())
}

/// Puts the current player's mark at `index` and settles the turn: a win or
/// tie fills `winner`, anything else hands the turn to the other player.
///
/// Callers validate `index` first.
pub fn place_mark(game: &mut Game, index: usize) -> Outcome {
    let mover = game.current;
    let mark = game.player(mover).mark;
    game.board.cells[index] = Some(mark);

    let outcome = rules::evaluate(&game.board.cells, mark);
    match outcome {
        Outcome::Won => game.winner = Some(game.player(mover).clone()),
        Outcome::Tie => game.winner = Some(Player::tie()),
        Outcome::Continue => game.current = mover.other(),
    }
    outcome
}
