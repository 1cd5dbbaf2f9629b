use std::time::Instant;

use glam::IVec2;
use rand::Rng;
use tracing::{debug, info};

use crate::error::{WorldError, WorldResult};
use crate::grid::{BiomeId, OverlayGrid, Terrain, TerrainGrid};
use crate::noise_field::{
    NoiseField, BIOME_SEED_OFFSET, ELEVATION_SEED_OFFSET, ROCK_DENSITY_SEED_OFFSET,
    ROCK_ZONE_SEED_OFFSET, TREE_DENSITY_SEED_OFFSET, TREE_ZONE_SEED_OFFSET,
};
use crate::occupant::{Occupant, ResourceKind, ResourceNode};
use crate::rng::{local_rng, SALT_BEACH, SALT_RESOURCE};
use crate::settings::GenerationSettings;
use crate::voronoi::VoronoiClassifier;

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedWorld {
    pub terrain: TerrainGrid,
    pub overlay: OverlayGrid,
}

/// Zone-size and zone-density fields for one resource kind.
#[derive(Clone, Debug)]
struct ResourceLayer {
    kind: ResourceKind,
    zones: NoiseField,
    density: NoiseField,
    zone_threshold: f64,
    density_threshold: f64,
}

impl ResourceLayer {
    fn new(seed: u64, kind: ResourceKind, settings: &GenerationSettings) -> WorldResult<Self> {
        let layer = match kind {
            ResourceKind::Tree => Self {
                kind,
                zones: NoiseField::new(seed, TREE_ZONE_SEED_OFFSET, settings.forest_size_scale)?,
                density: NoiseField::new(seed, TREE_DENSITY_SEED_OFFSET, settings.forest_density_scale)?,
                zone_threshold: settings.tree_zone_threshold,
                density_threshold: settings.tree_density_threshold,
            },
            ResourceKind::Rock => Self {
                kind,
                zones: NoiseField::new(seed, ROCK_ZONE_SEED_OFFSET, settings.rock_size_scale)?,
                density: NoiseField::new(seed, ROCK_DENSITY_SEED_OFFSET, settings.rock_density_scale)?,
                zone_threshold: settings.rock_zone_threshold,
                density_threshold: settings.rock_density_threshold,
            },
        };
        Ok(layer)
    }

    fn accepts(&self, x: i32, y: i32) -> bool {
        let (fx, fy) = (f64::from(x), f64::from(y));
        self.zones.sample(fx, fy) > self.zone_threshold
            && self.density.sample(fx, fy) > self.density_threshold
    }
}

#[derive(Clone, Debug)]
pub struct WorldGenerator {
    pub seed: u64,
    settings: GenerationSettings,
    elevation: NoiseField,
    biomes: VoronoiClassifier<BiomeId>,
    resources: Vec<ResourceLayer>,
}

impl WorldGenerator {
    pub fn new(seed: u64, settings: &GenerationSettings) -> WorldResult<Self> {
        settings.validate()?;

        let labels = (0..settings.biomes.len())
            .map(|i| {
                u8::try_from(i)
                    .map(BiomeId)
                    .map_err(|_| WorldError::invalid("too many biomes"))
            })
            .collect::<WorldResult<Vec<_>>>()?;

        let resources = ResourceKind::ALL
            .into_iter()
            .map(|kind| ResourceLayer::new(seed, kind, settings))
            .collect::<WorldResult<Vec<_>>>()?;

        Ok(Self {
            seed,
            elevation: NoiseField::new(seed, ELEVATION_SEED_OFFSET, settings.scale)?,
            biomes: VoronoiClassifier::new(
                seed.wrapping_add(BIOME_SEED_OFFSET),
                settings.biome_cell_size,
                labels,
                settings.minkowski_exponent,
            )?,
            resources,
            settings: settings.clone(),
        })
    }

    pub fn generate(&mut self) -> GeneratedWorld {
        let started = Instant::now();

        // Step 1: water below the threshold, Voronoi biomes everywhere else.
        let mut terrain = self.base_terrain();

        // Step 2: grow ragged beaches around every water cell.
        let widened = self.widen_shorelines(&mut terrain);

        // Step 3: drop sand that touches neither sand nor water.
        let reverted = self.smooth_shorelines(&mut terrain);

        // Step 4: scatter resources over the finished terrain.
        let overlay = self.place_resources(&terrain);

        let water = terrain.as_slice().iter().filter(|t| t.is_water()).count();
        let sand = terrain.as_slice().iter().filter(|t| **t == Terrain::Sand).count();
        debug!("Shoreline passes: {widened} cells widened to sand, {reverted} reverted");
        info!(
            "Generated {}x{} world (seed {}) in {:.1?}: {water} water, {sand} sand, {} resources",
            terrain.width(),
            terrain.height(),
            self.seed,
            started.elapsed(),
            overlay.occupied_count(),
        );

        GeneratedWorld { terrain, overlay }
    }

    fn base_terrain(&mut self) -> TerrainGrid {
        let (width, height) = (self.settings.width, self.settings.height);
        let mut terrain = TerrainGrid::new_filled(width, height, Terrain::Water);
        for y in 0..height {
            for x in 0..width {
                let elevation = self.elevation.sample(f64::from(x), f64::from(y));
                if elevation >= self.settings.water_threshold {
                    terrain.set(IVec2::new(x, y), Terrain::Biome(self.biomes.classify(x, y)));
                }
            }
        }
        terrain
    }

    /// Radius each cell tolerates before it turns to sand; a pure function of
    /// the seed and the cell.
    fn beach_threshold(&self, cell: IVec2) -> f64 {
        let mut rng = local_rng(self.seed, SALT_BEACH, cell.x, cell.y);
        rng.gen_range(0.0..=f64::from(self.settings.beach_width))
    }

    fn widen_shorelines(&self, terrain: &mut TerrainGrid) -> usize {
        let beach = self.settings.beach_width;
        let water: Vec<IVec2> = terrain
            .cells()
            .filter(|(_, t)| t.is_water())
            .map(|(cell, _)| cell)
            .collect();

        let mut widened = 0;
        for source in water {
            for dy in -beach..=beach {
                for dx in -beach..=beach {
                    let cell = source + IVec2::new(dx, dy);
                    if !matches!(terrain.get(cell), Some(Terrain::Biome(_))) {
                        continue;
                    }
                    let threshold = self.beach_threshold(cell);
                    let distance_sq = f64::from(dx * dx + dy * dy);
                    if distance_sq <= threshold * threshold {
                        terrain.set(cell, Terrain::Sand);
                        widened += 1;
                    }
                }
            }
        }
        widened
    }

    fn smooth_shorelines(&mut self, terrain: &mut TerrainGrid) -> usize {
        let mut total = 0;
        // Reverting one cell can strand a neighbour that leaned on it.
        loop {
            let mut reverted = 0;
            for y in 0..terrain.height() {
                for x in 0..terrain.width() {
                    let cell = IVec2::new(x, y);
                    if terrain.get(cell) == Some(&Terrain::Sand) && is_isolated_sand(terrain, cell) {
                        terrain.set(cell, Terrain::Biome(self.biomes.classify(x, y)));
                        reverted += 1;
                    }
                }
            }
            total += reverted;
            if reverted == 0 {
                return total;
            }
        }
    }

    fn place_resources(&self, terrain: &TerrainGrid) -> OverlayGrid {
        let mut overlay = OverlayGrid::empty(terrain.width(), terrain.height());
        for (cell, &ground) in terrain.cells() {
            if ground.is_water() {
                continue;
            }
            for layer in &self.resources {
                if !layer.kind.can_grow_on(ground) || overlay.is_occupied(cell) {
                    continue;
                }
                if layer.accepts(cell.x, cell.y) {
                    let mut rng = local_rng(self.seed, SALT_RESOURCE, cell.x, cell.y);
                    let node = ResourceNode::roll(layer.kind, &mut rng);
                    overlay.set(cell, Some(Occupant::Resource(node)));
                }
            }
        }
        overlay
    }
}

/// Cells checked by shoreline smoothing: for each diagonal offset `d` of -1
/// and +1, the horizontal neighbour `(x + d, y)` and the vertical neighbour
/// `(x, y + d)`.
pub fn shore_probes(cell: IVec2) -> [IVec2; 4] {
    [
        IVec2::new(cell.x - 1, cell.y),
        IVec2::new(cell.x, cell.y - 1),
        IVec2::new(cell.x + 1, cell.y),
        IVec2::new(cell.x, cell.y + 1),
    ]
}

/// True when none of the probes around `cell` is sand or water. Probes off the
/// grid count as neither.
pub fn is_isolated_sand(terrain: &TerrainGrid, cell: IVec2) -> bool {
    !shore_probes(cell)
        .iter()
        .any(|probe| terrain.get(*probe).is_some_and(|t| t.is_shore()))
}
