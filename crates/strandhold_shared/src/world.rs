use glam::{IVec2, Vec2};
use tracing::debug;

use crate::coords::{ChunkPos, GridMapper, GridRect};
use crate::error::{PlacementError, WorldError, WorldResult};
use crate::grid::{OverlayGrid, Terrain, TerrainGrid};
use crate::occupant::{BlockKind, DamageOutcome, HarvestYield, Occupant, PlacedBlock};
use crate::pathfinding::{find_path, Goal, Path};
use crate::rng::{local_rng, SALT_HARVEST};
use crate::settings::{NavSettings, WorldSettings};
use crate::worldgen::{GeneratedWorld, WorldGenerator};

/// An occupant that left the overlay since the last drain.
#[derive(Clone, Debug, PartialEq)]
pub struct RemovedOccupant {
    pub cell: IVec2,
    pub occupant: Occupant,
}

/// A fully generated world. Terrain is fixed; the overlay changes as
/// resources are harvested and blocks are built or destroyed.
#[derive(Clone, Debug)]
pub struct WorldHandle {
    settings: WorldSettings,
    mapper: GridMapper,
    terrain: TerrainGrid,
    overlay: OverlayGrid,
    removed: Vec<RemovedOccupant>,
}

pub fn generate_world(settings: &WorldSettings) -> WorldResult<WorldHandle> {
    let mut generator = WorldGenerator::new(settings.seed, &settings.generation)?;
    let GeneratedWorld { terrain, overlay } = generator.generate();
    WorldHandle::from_parts(settings.clone(), terrain, overlay)
}

impl WorldHandle {
    pub fn from_parts(
        settings: WorldSettings,
        terrain: TerrainGrid,
        overlay: OverlayGrid,
    ) -> WorldResult<Self> {
        let generation = &settings.generation;
        let mapper = GridMapper::new(
            terrain.width(),
            terrain.height(),
            generation.cell_pixel_size,
            generation.chunk_size,
        )?;
        if overlay.width() != terrain.width() || overlay.height() != terrain.height() {
            return Err(WorldError::invalid(format!(
                "overlay is {}x{} but terrain is {}x{}",
                overlay.width(),
                overlay.height(),
                terrain.width(),
                terrain.height()
            )));
        }

        Ok(Self {
            settings,
            mapper,
            terrain,
            overlay,
            removed: Vec::new(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.settings.seed
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn nav_settings(&self) -> &NavSettings {
        &self.settings.navigation
    }

    pub fn mapper(&self) -> &GridMapper {
        &self.mapper
    }

    pub fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    pub fn overlay(&self) -> &OverlayGrid {
        &self.overlay
    }

    pub fn terrain_at(&self, cell: IVec2) -> Option<Terrain> {
        self.terrain.get(cell).copied()
    }

    pub fn biome_name(&self, cell: IVec2) -> Option<&str> {
        let id = self.terrain_at(cell)?.biome()?;
        self.settings
            .generation
            .biomes
            .get(usize::from(id.0))
            .map(String::as_str)
    }

    pub fn grid_to_world(&self, cell: IVec2) -> Vec2 {
        self.mapper.grid_to_world(cell)
    }

    pub fn world_to_grid(&self, pos: Vec2) -> IVec2 {
        self.mapper.world_to_grid(pos)
    }

    pub fn chunk_of(&self, pos: Vec2) -> ChunkPos {
        self.mapper.chunk_of(pos)
    }

    pub fn chunk_bounds(&self, chunk: ChunkPos) -> GridRect {
        self.mapper.chunk_bounds(chunk)
    }

    /// Plans over the current overlay with the configured expansion budget.
    pub fn find_path(&self, start: IVec2, goal: Goal, bounds: Option<GridRect>) -> Path {
        find_path(
            start,
            goal,
            &self.overlay,
            bounds,
            self.settings.navigation.max_expansions,
        )
    }

    /// Puts `occupant` on `cell` without any terrain checks, returning what was
    /// there before. Out-of-grid cells are ignored.
    pub fn insert_occupant(&mut self, cell: IVec2, occupant: Occupant) -> Option<Occupant> {
        self.overlay.set(cell, Some(occupant)).flatten()
    }

    /// One mining hit on the resource at `cell`. Returns `None` when there is
    /// no resource there.
    pub fn harvest(&mut self, cell: IVec2) -> Option<HarvestYield> {
        let seed = self.settings.seed;
        let Some(Occupant::Resource(node)) = self.overlay.occupant_mut(cell) else {
            return None;
        };
        let mut rng = local_rng(seed.wrapping_add(u64::from(node.hits)), SALT_HARVEST, cell.x, cell.y);
        let harvest = node.mine(&mut rng);
        if harvest.depleted {
            self.remove(cell);
        }
        Some(harvest)
    }

    pub fn place_block(&mut self, cell: IVec2, kind: BlockKind) -> Result<(), PlacementError> {
        match self.terrain_at(cell) {
            None => return Err(PlacementError::OutOfBounds),
            Some(Terrain::Water) => return Err(PlacementError::Water),
            Some(_) => {}
        }
        if self.overlay.is_occupied(cell) {
            return Err(PlacementError::Occupied);
        }
        self.overlay.set(cell, Some(Occupant::Block(PlacedBlock::new(kind))));
        Ok(())
    }

    /// Applies `amount` damage to whatever occupies `cell`, removing it when
    /// destroyed. Returns `None` for empty or out-of-grid cells.
    pub fn damage_cell(&mut self, cell: IVec2, amount: u32) -> Option<DamageOutcome> {
        let outcome = self.overlay.occupant_mut(cell)?.damage(amount);
        if outcome == DamageOutcome::Destroyed {
            self.remove(cell);
        }
        Some(outcome)
    }

    fn remove(&mut self, cell: IVec2) {
        if let Some(occupant) = self.overlay.take(cell) {
            debug!("Removed {:?} at {cell}", occupant.tag());
            self.removed.push(RemovedOccupant { cell, occupant });
        }
    }

    /// Occupants removed since the previous call, oldest first.
    pub fn drain_removed(&mut self) -> Vec<RemovedOccupant> {
        std::mem::take(&mut self.removed)
    }
}

#[cfg(test)]
mod tests {
    use glam::{IVec2, Vec2};

    use super::{generate_world, WorldHandle};
    use crate::coords::ChunkPos;
    use crate::error::PlacementError;
    use crate::grid::{BiomeId, OverlayGrid, Terrain, TerrainGrid};
    use crate::occupant::{BlockKind, DamageOutcome, Occupant, OccupantTag, ResourceKind, ResourceNode};
    use crate::pathfinding::Goal;
    use crate::settings::WorldSettings;

    fn flat_world(width: i32, height: i32) -> WorldHandle {
        let terrain = TerrainGrid::new_filled(width, height, Terrain::Biome(BiomeId(0)));
        WorldHandle::from_parts(
            WorldSettings::default(),
            terrain,
            OverlayGrid::empty(width, height),
        )
        .expect("valid world")
    }

    fn tree() -> Occupant {
        Occupant::Resource(ResourceNode {
            kind: ResourceKind::Tree,
            size: 1.0,
            sprite_px: 80,
            has_apple: false,
            hits: 0,
        })
    }

    #[test]
    fn generated_world_exposes_coordinate_helpers() {
        let mut settings = WorldSettings::with_seed(12);
        settings.generation.width = 32;
        settings.generation.height = 32;
        let world = generate_world(&settings).expect("generate world");

        assert_eq!(world.grid_to_world(IVec2::new(16, 16)), Vec2::ZERO);
        assert_eq!(world.world_to_grid(Vec2::ZERO), IVec2::new(16, 16));
        assert_eq!(world.chunk_of(Vec2::ZERO), ChunkPos::new(1, 1));
        assert_eq!(world.world_to_grid(Vec2::splat(1.0e9)), IVec2::new(31, 31));
    }

    #[test]
    fn mismatched_overlay_is_rejected() {
        let terrain = TerrainGrid::new_filled(4, 4, Terrain::Sand);
        let result = WorldHandle::from_parts(WorldSettings::default(), terrain, OverlayGrid::empty(3, 4));
        assert!(result.is_err());
    }

    #[test]
    fn harvesting_depletes_and_logs_removal() {
        let mut world = flat_world(8, 8);
        let cell = IVec2::new(2, 3);
        world.insert_occupant(cell, tree());

        let mut hits = 0;
        while let Some(harvest) = world.harvest(cell) {
            hits += 1;
            if harvest.depleted {
                break;
            }
        }
        assert_eq!(hits, 14);
        assert!(!world.overlay().is_occupied(cell));

        let removed = world.drain_removed();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].cell, cell);
        assert_eq!(removed[0].occupant.tag(), OccupantTag::Resource(ResourceKind::Tree));
        assert!(world.drain_removed().is_empty());
        assert!(world.harvest(cell).is_none());
    }

    #[test]
    fn blocks_need_dry_empty_ground() {
        let mut world = flat_world(6, 6);
        world.insert_occupant(IVec2::new(1, 1), Occupant::Obstacle);

        assert_eq!(world.place_block(IVec2::new(-1, 0), BlockKind::Wood), Err(PlacementError::OutOfBounds));
        assert_eq!(world.place_block(IVec2::new(1, 1), BlockKind::Wood), Err(PlacementError::Occupied));
        assert_eq!(world.place_block(IVec2::new(2, 2), BlockKind::Stone), Ok(()));
        assert_eq!(world.place_block(IVec2::new(2, 2), BlockKind::Stone), Err(PlacementError::Occupied));

        let mut terrain = TerrainGrid::new_filled(3, 3, Terrain::Sand);
        terrain.set(IVec2::new(1, 1), Terrain::Water);
        let mut wet = WorldHandle::from_parts(WorldSettings::default(), terrain, OverlayGrid::empty(3, 3))
            .expect("valid world");
        assert_eq!(wet.place_block(IVec2::new(1, 1), BlockKind::Wood), Err(PlacementError::Water));
        assert_eq!(wet.place_block(IVec2::new(0, 1), BlockKind::Wood), Ok(()));
    }

    #[test]
    fn damage_removes_destroyed_occupants_only() {
        let mut world = flat_world(6, 6);
        world.place_block(IVec2::new(1, 0), BlockKind::Stone).expect("place block");
        world.insert_occupant(IVec2::new(2, 0), Occupant::Obstacle);

        assert_eq!(world.damage_cell(IVec2::new(1, 0), 10), Some(DamageOutcome::Survived));
        assert_eq!(world.damage_cell(IVec2::new(1, 0), 55), Some(DamageOutcome::Destroyed));
        assert_eq!(world.damage_cell(IVec2::new(2, 0), 1_000), Some(DamageOutcome::Indestructible));
        assert_eq!(world.damage_cell(IVec2::new(3, 0), 5), None);
        assert_eq!(world.damage_cell(IVec2::new(30, 30), 5), None);

        assert!(!world.overlay().is_occupied(IVec2::new(1, 0)));
        assert!(world.overlay().is_occupied(IVec2::new(2, 0)));
        assert_eq!(world.drain_removed().len(), 1);
    }

    #[test]
    fn find_path_sees_placed_blocks() {
        let mut world = flat_world(8, 3);
        for y in 0..3 {
            world.place_block(IVec2::new(4, y), BlockKind::Wood).expect("place block");
        }
        let path = world.find_path(IVec2::ZERO, Goal::Column(6), None);
        assert!(!path.complete);

        world.damage_cell(IVec2::new(4, 0), 50);
        let path = world.find_path(IVec2::ZERO, Goal::Column(6), None);
        assert!(path.complete);
    }
}
