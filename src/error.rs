use crate::{CellCount, Coord};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("invalid configuration: {width}x{height} board with {mines} mines")]
    InvalidConfig {
        width: Coord,
        height: Coord,
        mines: CellCount,
    },
    #[error("coordinates out of bounds")]
    InvalidCoords,
    #[error("corrupt save data: {0}")]
    CorruptSave(String),
    #[error("save file I/O failed")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GameError>;
