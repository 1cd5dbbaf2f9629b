use noise::{NoiseFn, Perlin};

use crate::error::{WorldError, WorldResult};
use crate::rng::derive_seed;

pub const ELEVATION_SEED_OFFSET: u64 = 0;
pub const BIOME_SEED_OFFSET: u64 = 11;
pub const ROCK_DENSITY_SEED_OFFSET: u64 = 98;
pub const ROCK_ZONE_SEED_OFFSET: u64 = 99;
pub const TREE_ZONE_SEED_OFFSET: u64 = 100;
pub const TREE_DENSITY_SEED_OFFSET: u64 = 101;

// Perlin is zero on integer lattice points; shifting keeps integer cells
// from landing on them when `1 / scale` is a whole number.
const SAMPLE_PHASE: [f64; 2] = [0.318_309_886, 0.707_106_781];

/// Seeded 2D Perlin noise. Query coordinates are divided by `scale`, so a
/// larger scale gives larger features.
#[derive(Clone, Debug)]
pub struct NoiseField {
    perlin: Perlin,
    scale: f64,
}

impl NoiseField {
    pub fn new(seed: u64, offset: u64, scale: f64) -> WorldResult<Self> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(WorldError::invalid(format!(
                "noise scale must be positive, got {scale}"
            )));
        }

        Ok(Self {
            perlin: Perlin::new(derive_seed(seed, offset)),
            scale,
        })
    }

    pub fn sample(&self, x: f64, y: f64) -> f64 {
        self.perlin
            .get([x / self.scale + SAMPLE_PHASE[0], y / self.scale + SAMPLE_PHASE[1]])
    }
}
