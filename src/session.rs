use std::collections::BTreeSet;

use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::*;

/// Valid transitions:
/// - NotStarted -> InProgress (first reveal)
/// - InProgress -> Won | Lost (terminal, only a new session leaves them)
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    NotStarted,
    InProgress,
    Won,
    Lost,
}

impl SessionState {
    pub const fn is_initial(self) -> bool {
        matches!(self, Self::NotStarted)
    }

    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Changed cells and the resulting state after one player action, so a UI
/// can redraw only what moved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionUpdate {
    pub changed: BTreeSet<Coord2>,
    pub state: SessionState,
}

/// Read-only view of one cell for rendering.
///
/// `is_mine` and `misflagged` only light up once the session has finished.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CellSnapshot {
    pub state: CellState,
    pub is_mine: bool,
    pub misflagged: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub state: SessionState,
    pub width: Coord,
    pub height: Coord,
    pub mines: CellCount,
    pub revealed: CellCount,
    pub flagged: CellCount,
    pub mines_left: i32,
    pub elapsed_secs: u32,
}

/// One game from configuration to win or loss.
///
/// Owns its board exclusively; hosts hold exactly one mutable session at a
/// time and route every UI action through it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    board: Board,
    state: SessionState,
    revealed_count: CellCount,
    flagged_count: CellCount,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    triggered_mine: Option<Coord2>,
    seed: u64,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Result<Self> {
        Self::with_seed(config, rand::random())
    }

    /// Deterministic variant, mine placement depends only on the seed and
    /// the first-revealed cell.
    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self> {
        Ok(Self {
            board: Board::new(config)?,
            state: SessionState::default(),
            revealed_count: 0,
            flagged_count: 0,
            started_at: None,
            ended_at: None,
            triggered_mine: None,
            seed,
        })
    }

    pub(crate) fn from_parts(
        board: Board,
        state: SessionState,
        revealed_count: CellCount,
        flagged_count: CellCount,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
    ) -> Self {
        let triggered_mine = match state {
            SessionState::Lost => board
                .iter_coords()
                .find(|&pos| board.is_mine(pos) && board.cell(pos).is_revealed()),
            _ => None,
        };
        Self {
            board,
            state,
            revealed_count,
            flagged_count,
            started_at,
            ended_at,
            triggered_mine,
            seed: rand::random(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> GameConfig {
        self.board.config()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count
    }

    pub fn flagged_count(&self) -> CellCount {
        self.flagged_count
    }

    pub fn triggered_mine(&self) -> Option<Coord2> {
        self.triggered_mine
    }

    /// Mines minus flags, may go negative when the player over-flags.
    pub fn mines_left(&self) -> i32 {
        i32::from(self.board.mine_count()) - i32::from(self.flagged_count)
    }

    /// Seconds since the first reveal, frozen once the session finishes.
    pub fn elapsed_secs(&self) -> u32 {
        if let Some(started_at) = self.started_at {
            (self.ended_at.unwrap_or_else(Utc::now) - started_at)
                .num_seconds()
                .max(0) as u32
        } else {
            0
        }
    }

    pub fn cell(&self, coords: Coord2) -> Result<CellSnapshot> {
        let coords = self.board.validate_coords(coords)?;
        let state = self.board.cell(coords);
        let finished = self.state.is_finished();
        let is_mine = finished && self.board.is_mine(coords);
        Ok(CellSnapshot {
            state,
            is_mine,
            misflagged: finished && state == CellState::Flagged && !self.board.is_mine(coords),
        })
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            state: self.state,
            width: self.board.width(),
            height: self.board.height(),
            mines: self.board.mine_count(),
            revealed: self.revealed_count,
            flagged: self.flagged_count,
            mines_left: self.mines_left(),
            elapsed_secs: self.elapsed_secs(),
        }
    }

    /// Reveals a cell. The first reveal places the mines, excluding the
    /// clicked cell and its neighborhood, then starts the clock.
    pub fn reveal(&mut self, coords: Coord2) -> Result<ActionUpdate> {
        let coords = self.board.validate_coords(coords)?;
        if self.state.is_finished() {
            return Ok(self.no_change());
        }

        if self.board.cell(coords) == CellState::Hidden && !self.board.mines_placed() {
            let generator = RandomGenerator::new(self.seed, ExclusionZone::Neighborhood);
            self.board.place_mines(coords, &generator);
        }

        let result = crate::reveal::reveal(&mut self.board, coords);
        Ok(self.apply_reveal(result))
    }

    /// Opens the neighbors of a satisfied numbered cell, with the same
    /// win/loss handling as a plain reveal.
    pub fn chord(&mut self, coords: Coord2) -> Result<ActionUpdate> {
        let coords = self.board.validate_coords(coords)?;
        if self.state.is_finished() || !self.board.mines_placed() {
            return Ok(self.no_change());
        }

        let result = crate::reveal::chord(&mut self.board, coords);
        Ok(self.apply_reveal(result))
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<ActionUpdate> {
        self.toggle_with(coords, crate::reveal::toggle_flag)
    }

    /// Right-click cycle with the question marker in between.
    pub fn toggle_flag_question(&mut self, coords: Coord2) -> Result<ActionUpdate> {
        self.toggle_with(coords, crate::reveal::toggle_flag_question)
    }

    fn toggle_with(
        &mut self,
        coords: Coord2,
        toggle: fn(&mut Board, Coord2) -> FlagOutcome,
    ) -> Result<ActionUpdate> {
        let coords = self.board.validate_coords(coords)?;
        if self.state.is_finished() {
            return Ok(self.no_change());
        }

        let was_flagged = self.board.cell(coords) == CellState::Flagged;
        let outcome = toggle(&mut self.board, coords);
        let now_flagged = self.board.cell(coords) == CellState::Flagged;
        match (was_flagged, now_flagged) {
            (false, true) => self.flagged_count += 1,
            (true, false) => self.flagged_count -= 1,
            _ => {}
        }

        let mut changed = BTreeSet::new();
        if outcome.has_update() {
            changed.insert(coords);
        }
        Ok(ActionUpdate {
            changed,
            state: self.state,
        })
    }

    fn apply_reveal(&mut self, result: RevealResult) -> ActionUpdate {
        let mut changed = result.revealed.clone();
        let safe_revealed = result
            .revealed
            .iter()
            .filter(|&&pos| !self.board.is_mine(pos))
            .count() as CellCount;
        self.revealed_count += safe_revealed;

        if let Some(mine) = result.triggered_mine {
            self.mark_started();
            self.triggered_mine = Some(mine);
            self.state = SessionState::Lost;
            self.ended_at = Some(Utc::now());
            changed.extend(self.expose_mines());
            log::debug!("mine triggered at {:?}, session lost", mine);
        } else if !result.revealed.is_empty() {
            if self.revealed_count == self.board.safe_cells() {
                self.mark_started();
                self.state = SessionState::Won;
                self.ended_at = Some(Utc::now());
                changed.extend(self.flag_remaining_mines());
                log::debug!("all safe cells revealed, session won");
            } else {
                self.mark_started();
            }
        }

        ActionUpdate {
            changed,
            state: self.state,
        }
    }

    fn mark_started(&mut self) {
        if self.state.is_initial() {
            let now = Utc::now();
            log::debug!("session started at {now}");
            self.started_at = Some(now);
            self.state = SessionState::InProgress;
        }
    }

    /// End-of-game display after a loss: every unflagged mine is shown.
    /// These reveals never count toward `revealed_count`.
    fn expose_mines(&mut self) -> Vec<Coord2> {
        let mut changed = Vec::new();
        for pos in self.board.iter_coords() {
            if self.board.is_mine(pos)
                && matches!(self.board.cell(pos), CellState::Hidden | CellState::Question)
            {
                let count = self.board.adjacent_mines(pos);
                self.board.set_cell(pos, CellState::Revealed(count));
                changed.push(pos);
            }
        }
        changed
    }

    /// After a win the leftover mines are flagged for the player.
    fn flag_remaining_mines(&mut self) -> Vec<Coord2> {
        let mut changed = Vec::new();
        for pos in self.board.iter_coords() {
            if self.board.is_mine(pos)
                && matches!(self.board.cell(pos), CellState::Hidden | CellState::Question)
            {
                self.board.set_cell(pos, CellState::Flagged);
                self.flagged_count += 1;
                changed.push(pos);
            }
        }
        changed
    }

    fn no_change(&self) -> ActionUpdate {
        ActionUpdate {
            changed: BTreeSet::new(),
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nine_by_nine(seed: u64) -> GameSession {
        GameSession::with_seed(GameConfig::new(9, 9, 10).unwrap(), seed).unwrap()
    }

    fn first_mine(session: &GameSession) -> Coord2 {
        session
            .board()
            .iter_coords()
            .find(|&pos| session.board().is_mine(pos))
            .unwrap()
    }

    #[test]
    fn first_reveal_never_loses() {
        for seed in 0..1000 {
            let mut session = nine_by_nine(seed);
            let update = session.reveal((4, 4)).unwrap();
            assert_ne!(update.state, SessionState::Lost, "seed {seed}");
            assert!(session.revealed_count() >= 9, "seed {seed}");
        }
    }

    #[test]
    fn first_reveal_starts_the_session() {
        let mut session = nine_by_nine(3);
        assert_eq!(session.state(), SessionState::NotStarted);

        let update = session.reveal((4, 4)).unwrap();

        assert_eq!(update.state, SessionState::InProgress);
        assert!(!update.changed.is_empty());
        assert!(session.board().mines_placed());
    }

    #[test]
    fn revealing_a_mine_loses_and_freezes_the_session() {
        let mut session = nine_by_nine(7);
        session.reveal((4, 4)).unwrap();
        let revealed_before = session.revealed_count();
        let mine = first_mine(&session);

        let update = session.reveal(mine).unwrap();

        assert_eq!(update.state, SessionState::Lost);
        assert_eq!(session.revealed_count(), revealed_before);
        assert_eq!(session.triggered_mine(), Some(mine));
        // every unflagged mine is shown for the end-of-game display
        for pos in session.board().iter_coords() {
            if session.board().is_mine(pos) {
                assert!(session.board().cell(pos).is_revealed());
            }
        }
        // frozen: no further action changes anything
        assert!(session.reveal((0, 0)).unwrap().changed.is_empty());
        assert!(session.toggle_flag((0, 0)).unwrap().changed.is_empty());
        assert_eq!(session.state(), SessionState::Lost);
    }

    #[test]
    fn win_triggers_exactly_when_all_safe_cells_are_open() {
        // 2x1 with one mine: a single safe cell.
        let mut session =
            GameSession::with_seed(GameConfig::new(2, 1, 1).unwrap(), 5).unwrap();

        let update = session.reveal((0, 0)).unwrap();

        assert_eq!(update.state, SessionState::Won);
        assert_eq!(session.revealed_count(), 1);
        // the leftover mine is flagged for the player
        assert_eq!(session.board().cell((0, 1)), CellState::Flagged);
        assert_eq!(session.flagged_count(), 1);
        assert_eq!(session.mines_left(), 0);
    }

    #[test]
    fn win_is_not_declared_early() {
        let mut session = nine_by_nine(11);
        session.reveal((4, 4)).unwrap();
        if session.revealed_count() < session.board().safe_cells() {
            assert_eq!(session.state(), SessionState::InProgress);
        }
    }

    #[test]
    fn flagging_is_tracked_and_blocks_reveal() {
        let mut session = nine_by_nine(2);
        session.reveal((4, 4)).unwrap();
        let hidden = session
            .board()
            .iter_coords()
            .find(|&pos| session.board().cell(pos) == CellState::Hidden)
            .unwrap();

        session.toggle_flag(hidden).unwrap();
        assert_eq!(session.flagged_count(), 1);
        assert_eq!(session.mines_left(), 9);

        // reveal is a no-op while the flag is up
        let update = session.reveal(hidden).unwrap();
        assert!(update.changed.is_empty());
        assert_eq!(session.board().cell(hidden), CellState::Flagged);

        session.toggle_flag(hidden).unwrap();
        assert_eq!(session.flagged_count(), 0);
    }

    #[test]
    fn flagging_a_revealed_cell_is_rejected() {
        let mut session = nine_by_nine(2);
        session.reveal((4, 4)).unwrap();

        let update = session.toggle_flag((4, 4)).unwrap();

        assert!(update.changed.is_empty());
        assert_eq!(session.flagged_count(), 0);
        assert!(session.board().cell((4, 4)).is_revealed());
    }

    #[test]
    fn question_marks_do_not_count_as_flags() {
        let mut session = nine_by_nine(2);
        session.toggle_flag_question((0, 0)).unwrap();
        assert_eq!(session.flagged_count(), 1);

        session.toggle_flag_question((0, 0)).unwrap(); // flag -> question
        assert_eq!(session.board().cell((0, 0)), CellState::Question);
        assert_eq!(session.flagged_count(), 0);

        session.toggle_flag_question((0, 0)).unwrap(); // question -> hidden
        assert_eq!(session.board().cell((0, 0)), CellState::Hidden);
        assert_eq!(session.flagged_count(), 0);
    }

    #[test]
    fn out_of_bounds_coordinates_are_an_error() {
        let mut session = nine_by_nine(1);
        assert!(matches!(
            session.reveal((9, 0)),
            Err(GameError::InvalidCoords)
        ));
        assert!(matches!(
            session.toggle_flag((0, 9)),
            Err(GameError::InvalidCoords)
        ));
        assert!(matches!(session.cell((9, 9)), Err(GameError::InvalidCoords)));
    }

    #[test]
    fn chord_goes_through_the_same_state_logic() {
        let mut session = nine_by_nine(13);
        // chord before anything is revealed is a no-op
        let update = session.chord((4, 4)).unwrap();
        assert!(update.changed.is_empty());
        assert_eq!(session.state(), SessionState::NotStarted);
    }

    #[test]
    fn snapshots_hide_mines_until_the_game_ends() {
        let mut session = nine_by_nine(17);
        session.reveal((4, 4)).unwrap();
        let mine = first_mine(&session);
        assert!(!session.cell(mine).unwrap().is_mine);

        session.reveal(mine).unwrap();
        assert!(session.cell(mine).unwrap().is_mine);
    }

    #[test]
    fn misflagged_cells_show_up_after_a_loss() {
        let mut session = nine_by_nine(19);
        session.reveal((4, 4)).unwrap();
        let wrong = session
            .board()
            .iter_coords()
            .find(|&pos| {
                !session.board().is_mine(pos) && session.board().cell(pos) == CellState::Hidden
            })
            .unwrap();
        session.toggle_flag(wrong).unwrap();
        session.reveal(first_mine(&session)).unwrap();

        assert!(session.cell(wrong).unwrap().misflagged);
    }

    #[test]
    fn summary_reflects_the_session() {
        let mut session = nine_by_nine(23);
        session.reveal((4, 4)).unwrap();

        let summary = session.summary();

        assert_eq!(summary.width, 9);
        assert_eq!(summary.height, 9);
        assert_eq!(summary.mines, 10);
        assert_eq!(summary.state, SessionState::InProgress);
        assert_eq!(summary.revealed, session.revealed_count());
        assert_eq!(summary.mines_left, 10);
    }

    #[test]
    fn sessions_round_trip_through_serde() {
        let mut session = nine_by_nine(29);
        session.reveal((4, 4)).unwrap();
        session.toggle_flag((0, 0)).unwrap();

        let json = serde_json::to_string(&session).unwrap();
        let restored: GameSession = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, session);
    }
}
