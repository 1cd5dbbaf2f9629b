use glam::Vec2;

use strandhold_shared::{EntityId, NavSettings, Navigator, Rect, SimulationContext};

/// Half size of an enemy's collision box in world units.
pub const AGENT_HALF_EXTENT: f32 = 12.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AgentOutcome {
    Moving,
    ReachedBase,
}

pub struct Agent {
    pub id: EntityId,
    pub position: Vec2,
    navigator: Navigator,
}

impl Agent {
    pub fn new(id: EntityId, position: Vec2, nav: NavSettings, speed: f32) -> Self {
        Self {
            id,
            position,
            navigator: Navigator::new(nav, speed),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.position, Vec2::splat(AGENT_HALF_EXTENT))
    }

    /// Moves one tick towards `target` and reports whether the agent is now
    /// within `attack_range` of it.
    pub fn update(&mut self, ctx: &mut SimulationContext<'_>, target: Vec2, attack_range: f32) -> AgentOutcome {
        let movement = self.navigator.tick(ctx, self.position, target);
        self.position += movement;
        if self.position.distance(target) <= attack_range {
            AgentOutcome::ReachedBase
        } else {
            AgentOutcome::Moving
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Base {
    pub health: u32,
    pub max_health: u32,
}

impl Base {
    pub fn new(max_health: u32) -> Self {
        Self {
            health: max_health,
            max_health,
        }
    }

    pub fn take_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    pub fn is_destroyed(&self) -> bool {
        self.health == 0
    }
}
