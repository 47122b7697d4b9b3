/// Single axis of a board position, also used for width/height.
pub type Coord = u8;

/// Count type for mines, revealed cells, and total-cell counts.
pub type CellCount = u16;

/// Board position as `(row, col)`, row-major.
pub type Coord2 = (Coord, Coord);

/// Converts a `(row, col)` pair into an `ndarray` index.
pub trait GridIndex {
    fn nd(self) -> [usize; 2];
}

impl GridIndex for Coord2 {
    fn nd(self) -> [usize; 2] {
        [self.0.into(), self.1.into()]
    }
}

// 255 * 255 = 65025, so the product always fits a `CellCount`.
pub const fn cell_total(width: Coord, height: Coord) -> CellCount {
    width as CellCount * height as CellCount
}

const OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Iterates the up-to-8 in-bounds neighbors of `center` on a `rows x cols` grid.
pub fn neighbors(center: Coord2, bounds: Coord2) -> impl Iterator<Item = Coord2> {
    let (row, col) = center;
    let (rows, cols) = bounds;
    OFFSETS.iter().filter_map(move |&(dr, dc)| {
        let r = row.checked_add_signed(dr)?;
        let c = col.checked_add_signed(dc)?;
        (r < rows && c < cols).then_some((r, c))
    })
}
