use crate::*;
use ndarray::Array2;

pub use random::*;

mod random;

/// Produces a mine mask for `config` that keeps `exclude` safe.
pub trait MineGenerator {
    fn generate(&self, config: GameConfig, exclude: Coord2) -> Array2<bool>;
}

/// How much of the first-clicked cell's surroundings stays mine-free.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExclusionZone {
    /// No guarantee, the first click may lose.
    None,
    /// The clicked cell itself is never a mine.
    Cell,
    /// The clicked cell and its 8 neighbors: the first reveal always floods.
    Neighborhood,
}
