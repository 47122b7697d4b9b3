use std::collections::BTreeSet;

use ndarray::Array2;
use rand::prelude::*;
use rand::rngs::SmallRng;

use super::*;

/// Uniform random placement over the eligible cells, deterministic per seed.
///
/// When the mine count leaves no room for the requested exclusion zone the
/// zone shrinks step by step instead of retrying forever.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RandomGenerator {
    seed: u64,
    exclusion: ExclusionZone,
}

impl RandomGenerator {
    pub fn new(seed: u64, exclusion: ExclusionZone) -> Self {
        Self { seed, exclusion }
    }
}

impl MineGenerator for RandomGenerator {
    fn generate(&self, config: GameConfig, exclude: Coord2) -> Array2<bool> {
        let total = config.total_cells() as usize;
        let mines = config.mines as usize;

        let mut zone = self.exclusion;
        let mut keep_safe = zone_coords(config, exclude, zone);
        while mines > total - keep_safe.len() {
            zone = match zone {
                ExclusionZone::Neighborhood => {
                    log::warn!("no room to keep the opening clear, excluding only the clicked cell");
                    ExclusionZone::Cell
                }
                ExclusionZone::Cell => {
                    log::warn!("mine count fills the board, first click is not protected");
                    ExclusionZone::None
                }
                ExclusionZone::None => break,
            };
            keep_safe = zone_coords(config, exclude, zone);
        }

        let (rows, cols) = config.size();
        let eligible: Vec<Coord2> = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| (r, c)))
            .filter(|pos| !keep_safe.contains(pos))
            .collect();

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut mask = Array2::default(config.size().nd());
        for &pos in eligible.choose_multiple(&mut rng, mines) {
            mask[pos.nd()] = true;
        }
        mask
    }
}

fn zone_coords(config: GameConfig, exclude: Coord2, zone: ExclusionZone) -> BTreeSet<Coord2> {
    match zone {
        ExclusionZone::None => BTreeSet::new(),
        ExclusionZone::Cell => BTreeSet::from([exclude]),
        ExclusionZone::Neighborhood => {
            let mut set: BTreeSet<Coord2> = neighbors(exclude, config.size()).collect();
            set.insert(exclude);
            set
        }
    }
}
