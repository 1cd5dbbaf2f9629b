use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use strandhold_shared::{CollisionCache, Rect, WorldHandle};

const SPAWNER_SEED_SALT: u64 = 0x5350_4157_4e;
const PLACEMENT_ATTEMPTS: usize = 32;

/// Emits enemies at random intervals of up to `interval` seconds.
pub struct EnemySpawner {
    interval: f32,
    radius: f32,
    timer: f32,
    next_delay: f32,
    rng: ChaCha8Rng,
}

impl EnemySpawner {
    pub fn new(seed: u64, interval: f32, radius: f32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ SPAWNER_SEED_SALT);
        let next_delay = rng.gen::<f32>() * interval;
        Self {
            interval,
            radius,
            timer: 0.0,
            next_delay,
            rng,
        }
    }

    pub fn next_delay(&self) -> f32 {
        self.next_delay
    }

    /// True when a spawn is due this tick.
    pub fn tick(&mut self, delta: f32) -> bool {
        self.timer += delta;
        if self.timer < self.next_delay {
            return false;
        }
        self.timer = 0.0;
        self.next_delay = self.rng.gen::<f32>() * self.interval;
        true
    }

    /// A cell centre within `radius` of the origin on dry, empty ground with
    /// nothing in the collision cache. Gives up after a few attempts.
    pub fn pick_spawn_point(
        &mut self,
        world: &WorldHandle,
        collisions: &CollisionCache,
        half_extent: Vec2,
    ) -> Option<Vec2> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let offset = Vec2::new(
                self.rng.gen_range(-self.radius..=self.radius),
                self.rng.gen_range(-self.radius..=self.radius),
            );
            let cell = world.world_to_grid(offset);
            let Some(terrain) = world.terrain_at(cell) else {
                continue;
            };
            if terrain.is_water() || world.overlay().is_occupied(cell) {
                continue;
            }
            let position = world.grid_to_world(cell);
            if collisions.query(Rect::from_center(position, half_extent), None).is_some() {
                continue;
            }
            return Some(position);
        }
        None
    }
}
