use glam::{IVec2, Vec2};
use rustc_hash::FxHashMap;
use tracing::debug;

use strandhold_shared::{CollisionCache, EntityId, GridMapper, Rect, Scene};

#[derive(Copy, Clone, Debug, PartialEq)]
struct SceneEntry {
    cell: IVec2,
    position: Vec2,
}

/// Tracks entities pinned to grid cells (resources, blocks) and owns the
/// per-tick collision cache.
pub struct SceneRegistry {
    mapper: GridMapper,
    entries: FxHashMap<EntityId, SceneEntry>,
    by_cell: FxHashMap<IVec2, EntityId>,
    collisions: CollisionCache,
    next_id: u64,
}

impl SceneRegistry {
    pub fn new(mapper: GridMapper) -> Self {
        Self {
            mapper,
            entries: FxHashMap::default(),
            by_cell: FxHashMap::default(),
            collisions: CollisionCache::new(),
            next_id: 1,
        }
    }

    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entity_at(&self, cell: IVec2) -> Option<EntityId> {
        self.by_cell.get(&cell).copied()
    }

    pub fn unregister_cell(&mut self, cell: IVec2) -> Option<EntityId> {
        let entity = self.by_cell.get(&cell).copied()?;
        self.unregister(entity);
        Some(entity)
    }

    pub fn cell_half_extent(&self) -> Vec2 {
        Vec2::splat(self.mapper.cell_size() / 2.0)
    }

    /// Refills the collision cache from every registered cell plus the moving
    /// bodies in `agents`.
    pub fn rebuild_collisions(&mut self, tick: u64, agents: impl IntoIterator<Item = (EntityId, Rect)>) {
        let half = self.cell_half_extent();
        self.collisions.begin_tick(tick);
        for (entity, entry) in &self.entries {
            self.collisions.insert(*entity, Rect::from_center(entry.position, half));
        }
        for (entity, rect) in agents {
            self.collisions.insert(entity, rect);
        }
    }

    /// Adds a body to this tick's cache without a full rebuild.
    pub fn add_collider(&mut self, entity: EntityId, rect: Rect) {
        self.collisions.insert(entity, rect);
    }

    pub fn collisions(&self) -> &CollisionCache {
        &self.collisions
    }
}

impl Scene for SceneRegistry {
    fn world_position(&self, entity: EntityId) -> Option<Vec2> {
        self.entries.get(&entity).map(|entry| entry.position)
    }

    fn collision_query(&self, rect: Rect, exclude: Option<EntityId>) -> Option<EntityId> {
        self.collisions.query(rect, exclude)
    }

    fn register(&mut self, entity: EntityId, cell: IVec2) {
        if let Some(previous) = self.by_cell.insert(cell, entity) {
            self.entries.remove(&previous);
        }
        let position = self.mapper.grid_to_world(cell);
        self.entries.insert(entity, SceneEntry { cell, position });
    }

    fn unregister(&mut self, entity: EntityId) {
        let Some(entry) = self.entries.remove(&entity) else {
            debug!("Unregister for unknown entity {entity:?}");
            return;
        };
        if self.by_cell.get(&entry.cell) == Some(&entity) {
            self.by_cell.remove(&entry.cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{IVec2, Vec2};
    use strandhold_shared::{EntityId, GridMapper, Rect, Scene};

    use super::SceneRegistry;

    fn registry() -> SceneRegistry {
        SceneRegistry::new(GridMapper::new(10, 10, 32.0, 16).expect("valid mapper"))
    }

    #[test]
    fn register_and_unregister_track_cells() {
        let mut scene = registry();
        let tree = scene.allocate();
        scene.register(tree, IVec2::new(5, 5));

        assert_eq!(scene.entity_at(IVec2::new(5, 5)), Some(tree));
        assert_eq!(scene.world_position(tree), Some(Vec2::ZERO));

        assert_eq!(scene.unregister_cell(IVec2::new(5, 5)), Some(tree));
        assert_eq!(scene.world_position(tree), None);
        assert_eq!(scene.len(), 0);
    }

    #[test]
    fn registering_an_occupied_cell_replaces_the_entity() {
        let mut scene = registry();
        let first = scene.allocate();
        let second = scene.allocate();
        scene.register(first, IVec2::new(1, 1));
        scene.register(second, IVec2::new(1, 1));

        assert_eq!(scene.len(), 1);
        assert_eq!(scene.entity_at(IVec2::new(1, 1)), Some(second));
        assert_eq!(scene.world_position(first), None);
    }

    #[test]
    fn collision_queries_see_cells_and_agents() {
        let mut scene = registry();
        let rock = scene.allocate();
        scene.register(rock, IVec2::new(5, 5));
        let agent = EntityId(999);
        let agent_rect = Rect::from_center(Vec2::new(200.0, 0.0), Vec2::splat(8.0));
        scene.rebuild_collisions(3, [(agent, agent_rect)]);

        let near_rock = Rect::from_center(Vec2::new(4.0, 4.0), Vec2::splat(2.0));
        assert_eq!(scene.collision_query(near_rock, None), Some(rock));
        assert_eq!(scene.collision_query(near_rock, Some(rock)), None);
        assert_eq!(scene.collision_query(agent_rect, None), Some(agent));
        assert_eq!(scene.collisions().len(), 2);
    }
}
