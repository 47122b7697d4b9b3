use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

/// Grid of cells plus the mine layout behind them.
///
/// Mines are placed lazily by the first reveal so the clicked cell can be
/// excluded; until then `mines` is all-false and `placed` stays unset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    config: GameConfig,
    mines: Array2<bool>,
    counts: Array2<u8>,
    grid: Array2<CellState>,
    placed: bool,
}

impl Board {
    pub fn new(config: GameConfig) -> Result<Self> {
        config.validate()?;
        let dim = config.size().nd();
        Ok(Self {
            config,
            mines: Array2::default(dim),
            counts: Array2::default(dim),
            grid: Array2::default(dim),
            placed: false,
        })
    }

    pub fn config(&self) -> GameConfig {
        self.config
    }

    pub fn width(&self) -> Coord {
        self.config.width
    }

    pub fn height(&self) -> Coord {
        self.config.height
    }

    pub fn mine_count(&self) -> CellCount {
        self.config.mines
    }

    pub fn total_cells(&self) -> CellCount {
        self.config.total_cells()
    }

    pub fn safe_cells(&self) -> CellCount {
        self.config.safe_cells()
    }

    pub fn mines_placed(&self) -> bool {
        self.placed
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        let (rows, cols) = self.config.size();
        if coords.0 < rows && coords.1 < cols {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn neighbors(&self, coords: Coord2) -> impl Iterator<Item = Coord2> + use<> {
        neighbors(coords, self.config.size())
    }

    pub fn cell(&self, coords: Coord2) -> CellState {
        self.grid[coords.nd()]
    }

    pub fn is_mine(&self, coords: Coord2) -> bool {
        self.mines[coords.nd()]
    }

    /// Adjacent-mine count, valid once mines are placed.
    pub fn adjacent_mines(&self, coords: Coord2) -> u8 {
        self.counts[coords.nd()]
    }

    /// Places mines with `generator`, keeping `exclude` safe, then fills the
    /// adjacency counts. A second call is a no-op.
    pub fn place_mines(&mut self, exclude: Coord2, generator: &impl MineGenerator) {
        if self.placed {
            return;
        }
        self.mines = generator.generate(self.config, exclude);
        self.refresh_counts();
        self.placed = true;
        log::debug!(
            "placed {} mines on {}x{}, excluding {:?}",
            self.config.mines,
            self.config.width,
            self.config.height,
            exclude
        );
    }

    /// Restores a mine layout from a save record, skipping lazy placement.
    pub(crate) fn place_mines_from_mask(&mut self, mines: Array2<bool>) {
        debug_assert_eq!(mines.dim(), self.mines.dim());
        self.mines = mines;
        self.refresh_counts();
        self.placed = true;
    }

    pub(crate) fn set_cell(&mut self, coords: Coord2, state: CellState) {
        self.grid[coords.nd()] = state;
    }

    pub(crate) fn count_flagged_neighbors(&self, coords: Coord2) -> u8 {
        self.neighbors(coords)
            .filter(|&pos| self.cell(pos) == CellState::Flagged)
            .count() as u8
    }

    pub(crate) fn has_question_neighbor(&self, coords: Coord2) -> bool {
        self.neighbors(coords)
            .any(|pos| self.cell(pos) == CellState::Question)
    }

    pub(crate) fn iter_coords(&self) -> impl Iterator<Item = Coord2> + use<> {
        let (rows, cols) = self.config.size();
        (0..rows).flat_map(move |r| (0..cols).map(move |c| (r, c)))
    }

    fn refresh_counts(&mut self) {
        for pos in self.iter_coords() {
            let count = self.neighbors(pos).filter(|&n| self.mines[n.nd()]).count();
            self.counts[pos.nd()] = count as u8;
        }
    }
}
