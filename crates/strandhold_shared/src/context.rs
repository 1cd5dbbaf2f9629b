use glam::{IVec2, Vec2};

use crate::world::WorldHandle;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Axis-aligned rectangle in world units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_center(center: Vec2, half_extent: Vec2) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// Scene collaborator that owns entity transforms and collision shapes.
pub trait Scene {
    fn world_position(&self, entity: EntityId) -> Option<Vec2>;
    fn collision_query(&self, rect: Rect, exclude: Option<EntityId>) -> Option<EntityId>;
    fn register(&mut self, entity: EntityId, cell: IVec2);
    fn unregister(&mut self, entity: EntityId);
}

/// Collision shapes for one tick. Cleared and refilled at the start of every
/// tick, queried by gameplay afterwards.
#[derive(Clone, Debug, Default)]
pub struct CollisionCache {
    shapes: Vec<(EntityId, Rect)>,
    tick: u64,
}

impl CollisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_tick(&mut self, tick: u64) {
        self.shapes.clear();
        self.tick = tick;
    }

    pub fn insert(&mut self, entity: EntityId, rect: Rect) {
        self.shapes.push((entity, rect));
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// First shape overlapping `rect`, skipping `exclude`.
    pub fn query(&self, rect: Rect, exclude: Option<EntityId>) -> Option<EntityId> {
        self.shapes
            .iter()
            .find(|(entity, shape)| Some(*entity) != exclude && shape.intersects(&rect))
            .map(|(entity, _)| *entity)
    }
}

/// Everything a navigation or gameplay step needs for the current tick.
pub struct SimulationContext<'w> {
    pub delta: f32,
    pub elapsed: f64,
    pub tick: u64,
    pub world: &'w mut WorldHandle,
}

impl<'w> SimulationContext<'w> {
    pub fn new(delta: f32, elapsed: f64, tick: u64, world: &'w mut WorldHandle) -> Self {
        Self {
            delta,
            elapsed,
            tick,
            world,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::{CollisionCache, EntityId, Rect};

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::from_center(Vec2::ZERO, Vec2::splat(1.0));
        let b = Rect::from_center(Vec2::new(2.0, 0.0), Vec2::splat(1.0));
        let c = Rect::from_center(Vec2::new(1.5, 0.5), Vec2::splat(1.0));
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(a.contains_point(Vec2::new(1.0, -1.0)));
    }

    #[test]
    fn cache_query_honours_exclusion_and_reset() {
        let mut cache = CollisionCache::new();
        cache.begin_tick(1);
        cache.insert(EntityId(7), Rect::from_center(Vec2::ZERO, Vec2::splat(16.0)));
        cache.insert(EntityId(9), Rect::from_center(Vec2::new(4.0, 0.0), Vec2::splat(16.0)));

        let probe = Rect::from_center(Vec2::new(2.0, 2.0), Vec2::splat(4.0));
        assert_eq!(cache.query(probe, None), Some(EntityId(7)));
        assert_eq!(cache.query(probe, Some(EntityId(7))), Some(EntityId(9)));

        let far = Rect::from_center(Vec2::splat(500.0), Vec2::splat(4.0));
        assert_eq!(cache.query(far, None), None);

        cache.begin_tick(2);
        assert!(cache.is_empty());
        assert_eq!(cache.tick(), 2);
        assert_eq!(cache.query(probe, None), None);
    }
}
