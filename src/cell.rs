use serde::{Deserialize, Serialize};

/// Player-visible state of one board cell.
///
/// `Revealed` carries the adjacent-mine count so rendering never has to go
/// back to the mine layout for an open cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellState {
    #[default]
    Hidden,
    Flagged,
    Question,
    Revealed(u8),
}

impl CellState {
    pub const fn is_revealed(self) -> bool {
        matches!(self, Self::Revealed(_))
    }

    /// Flag and question markers both keep a cell out of reveal and chord.
    pub const fn is_marked(self) -> bool {
        matches!(self, Self::Flagged | Self::Question)
    }
}
