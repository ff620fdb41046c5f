//! Pure board evaluation: win and tie detection plus the opponent heuristic.

use crate::domain::{Cells, Mark, BOARD_CELLS};

/// Rows, then columns, then diagonals. The order is the heuristic's tie-break.
pub const WINNING_TRIPLES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Tie,
    Continue,
}

pub fn check_winner(cells: &Cells, mark: Mark) -> bool {
    WINNING_TRIPLES
        .iter()
        .any(|triple| triple.iter().all(|&i| cells[i] == Some(mark)))
}

pub fn is_tie(cells: &Cells, winner_already_set: bool) -> bool {
    !winner_already_set && cells.iter().all(Option::is_some)
}

/// Returns the empty cell that would complete a line for `mark`, if any.
pub fn find_best_move(cells: &Cells, mark: Mark) -> Option<usize> {
    WINNING_TRIPLES
        .iter()
        .find_map(|triple| completing_cell(cells, triple, mark))
}

fn completing_cell(cells: &Cells, triple: &[usize; 3], mark: Mark) -> Option<usize> {
    let marked = triple.iter().filter(|&&i| cells[i] == Some(mark)).count();
    if marked != 2 {
        return None;
    }
    triple.iter().copied().find(|&i| cells[i].is_none())
}

pub fn empty_cells(cells: &Cells) -> Vec<usize> {
    (0..BOARD_CELLS).filter(|&i| cells[i].is_none()).collect()
}

/// Single evaluation used after every placement, human or automated.
pub fn evaluate(cells: &Cells, mover: Mark) -> Outcome {
    if check_winner(cells, mover) {
        Outcome::Won
    } else if is_tie(cells, false) {
        Outcome::Tie
    } else {
        Outcome::Continue
    }
}

#[cfg(test)]
#[path = "tests/rules_tests.rs"]
mod tests;
