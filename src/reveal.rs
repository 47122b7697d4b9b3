use std::collections::{BTreeSet, VecDeque};

use crate::*;

/// Cells newly revealed by one action, plus the mine that ended it, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevealResult {
    pub revealed: BTreeSet<Coord2>,
    pub triggered_mine: Option<Coord2>,
}

impl RevealResult {
    pub fn hit_mine(&self) -> bool {
        self.triggered_mine.is_some()
    }
}

/// Outcome of a flag or question toggle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    NoChange,
    Changed,
}

impl FlagOutcome {
    pub const fn has_update(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Reveals one cell; zero-count cells open their whole region.
///
/// Revealed, flagged, and question-marked cells are left alone. A mine stops
/// immediately with `triggered_mine` set, the caller decides how to end the
/// game.
pub fn reveal(board: &mut Board, coords: Coord2) -> RevealResult {
    let mut result = RevealResult::default();
    reveal_single(board, coords, &mut result);
    result
}

/// Opens every unmarked hidden neighbor of a revealed cell whose flagged
/// neighbors match its count. Question marks around the cell veto the chord.
pub fn chord(board: &mut Board, coords: Coord2) -> RevealResult {
    let mut result = RevealResult::default();
    if let CellState::Revealed(count) = board.cell(coords)
        && count == board.count_flagged_neighbors(coords)
        && !board.has_question_neighbor(coords)
    {
        for pos in board.neighbors(coords) {
            reveal_single(board, pos, &mut result);
        }
    }
    result
}

pub fn toggle_flag(board: &mut Board, coords: Coord2) -> FlagOutcome {
    use CellState::*;
    match board.cell(coords) {
        Hidden => {
            board.set_cell(coords, Flagged);
            FlagOutcome::Changed
        }
        Flagged | Question => {
            board.set_cell(coords, Hidden);
            FlagOutcome::Changed
        }
        Revealed(_) => FlagOutcome::NoChange,
    }
}

/// Cycles hidden -> flag -> question -> hidden, the desktop right-click cycle.
pub fn toggle_flag_question(board: &mut Board, coords: Coord2) -> FlagOutcome {
    use CellState::*;
    match board.cell(coords) {
        Hidden => {
            board.set_cell(coords, Flagged);
            FlagOutcome::Changed
        }
        Flagged => {
            board.set_cell(coords, Question);
            FlagOutcome::Changed
        }
        Question => {
            board.set_cell(coords, Hidden);
            FlagOutcome::Changed
        }
        Revealed(_) => FlagOutcome::NoChange,
    }
}

fn reveal_single(board: &mut Board, coords: Coord2, result: &mut RevealResult) {
    if board.cell(coords) != CellState::Hidden {
        return;
    }

    if board.is_mine(coords) {
        board.set_cell(coords, CellState::Revealed(board.adjacent_mines(coords)));
        result.revealed.insert(coords);
        result.triggered_mine.get_or_insert(coords);
        return;
    }

    let count = board.adjacent_mines(coords);
    board.set_cell(coords, CellState::Revealed(count));
    result.revealed.insert(coords);
    log::trace!("revealed {:?}, {} adjacent mines", coords, count);

    if count > 0 {
        return;
    }

    // Flood the zero region with an explicit frontier, each cell visited once.
    let mut visited = BTreeSet::from([coords]);
    let mut frontier: VecDeque<Coord2> = board
        .neighbors(coords)
        .filter(|&pos| board.cell(pos) == CellState::Hidden)
        .collect();

    while let Some(pos) = frontier.pop_front() {
        if !visited.insert(pos) {
            continue;
        }
        if board.cell(pos) != CellState::Hidden {
            continue;
        }

        let pos_count = board.adjacent_mines(pos);
        board.set_cell(pos, CellState::Revealed(pos_count));
        result.revealed.insert(pos);

        if pos_count == 0 {
            frontier.extend(
                board
                    .neighbors(pos)
                    .filter(|&p| board.cell(p) == CellState::Hidden)
                    .filter(|p| !visited.contains(p)),
            );
        }
    }
}
