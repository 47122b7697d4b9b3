//! Minesweeper board and session engine.
//!
//! The crate covers everything below the widget layer of a desktop
//! Minesweeper: lazy mine placement that keeps the first click safe,
//! flood-fill reveal, chording, win/loss tracking, and an INI-style save
//! format with a fixed quick-save slot for resuming interrupted games.

use serde::{Deserialize, Serialize};

pub use board::*;
pub use cell::*;
pub use error::*;
pub use generator::*;
pub use reveal::*;
pub use save::*;
pub use session::*;
pub use types::*;

mod board;
mod cell;
mod error;
mod generator;
mod reveal;
mod save;
mod session;
mod types;

/// Default board preferences of the desktop app.
pub const DEFAULT_WIDTH: Coord = 10;
pub const DEFAULT_HEIGHT: Coord = 10;
pub const DEFAULT_MINES: CellCount = 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub width: Coord,
    pub height: Coord,
    pub mines: CellCount,
}

impl GameConfig {
    pub const fn new_unchecked(width: Coord, height: Coord, mines: CellCount) -> Self {
        Self {
            width,
            height,
            mines,
        }
    }

    pub fn new(width: Coord, height: Coord, mines: CellCount) -> Result<Self> {
        let config = Self::new_unchecked(width, height, mines);
        config.validate()?;
        Ok(config)
    }

    /// Dimensions must be at least 1x1 and mines must leave one safe cell.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.mines >= self.total_cells() {
            return Err(GameError::InvalidConfig {
                width: self.width,
                height: self.height,
                mines: self.mines,
            });
        }
        Ok(())
    }

    pub const fn total_cells(&self) -> CellCount {
        cell_total(self.width, self.height)
    }

    pub const fn safe_cells(&self) -> CellCount {
        self.total_cells() - self.mines
    }

    pub const fn size(&self) -> Coord2 {
        (self.height, self.width)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new_unchecked(DEFAULT_WIDTH, DEFAULT_HEIGHT, DEFAULT_MINES)
    }
}
