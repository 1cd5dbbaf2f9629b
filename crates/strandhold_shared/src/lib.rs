pub mod context;
pub mod coords;
pub mod error;
pub mod grid;
pub mod navigator;
pub mod noise_field;
pub mod occupant;
pub mod pathfinding;
pub mod rng;
pub mod settings;
pub mod voronoi;
pub mod world;
pub mod worldgen;

pub use context::{CollisionCache, EntityId, Rect, Scene, SimulationContext};
pub use coords::{ChunkPos, GridMapper, GridRect};
pub use error::{PlacementError, WorldError, WorldResult};
pub use grid::{BiomeId, OverlayGrid, Terrain, TerrainGrid};
pub use navigator::{NavState, Navigator};
pub use occupant::{
    BlockKind, DamageOutcome, HarvestYield, ItemKind, Occupant, OccupantTag, PlacedBlock, ResourceKind, ResourceNode,
};
pub use pathfinding::{find_path, Goal, Path};
pub use settings::{GenerationSettings, NavSettings, WorldSettings};
pub use world::{generate_world, RemovedOccupant, WorldHandle};
