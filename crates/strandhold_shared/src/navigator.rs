use std::collections::VecDeque;

use glam::{IVec2, Vec2};
use tracing::debug;

use crate::context::SimulationContext;
use crate::coords::{ChunkPos, GridMapper};
use crate::occupant::DamageOutcome;
use crate::pathfinding::Goal;
use crate::settings::NavSettings;
use crate::world::WorldHandle;

const RECOVERY_OFFSETS: [IVec2; 5] = [
    IVec2::ZERO,
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, 1),
    IVec2::new(0, -1),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NavState {
    Idle,
    Following,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkStep {
    North,
    South,
    East,
    West,
    FinalApproach,
}

impl ChunkStep {
    pub fn offset(self) -> Option<ChunkPos> {
        match self {
            ChunkStep::North => Some(ChunkPos::new(0, -1)),
            ChunkStep::South => Some(ChunkPos::new(0, 1)),
            ChunkStep::East => Some(ChunkPos::new(1, 0)),
            ChunkStep::West => Some(ChunkPos::new(-1, 0)),
            ChunkStep::FinalApproach => None,
        }
    }
}

/// North is decreasing `y`; equal deltas step vertically.
pub fn next_chunk_step(current: ChunkPos, target: ChunkPos) -> ChunkStep {
    let delta = target - current;
    let (ax, ay) = (delta.x.abs(), delta.y.abs());
    if (ax == 0 && ay == 0) || (ax == 1 && ay == 1) {
        return ChunkStep::FinalApproach;
    }
    if ay >= ax {
        if delta.y < 0 {
            ChunkStep::North
        } else {
            ChunkStep::South
        }
    } else if delta.x > 0 {
        ChunkStep::East
    } else {
        ChunkStep::West
    }
}

pub fn edge_goal(mapper: &GridMapper, from: ChunkPos, step: ChunkStep) -> Option<Goal> {
    let dest = mapper.chunk_bounds(from + step.offset()?);
    Some(match step {
        ChunkStep::North => Goal::Row(dest.max.y),
        ChunkStep::South => Goal::Row(dest.min.y),
        ChunkStep::East => Goal::Column(dest.min.x),
        ChunkStep::West => Goal::Column(dest.max.x),
        ChunkStep::FinalApproach => return None,
    })
}

#[derive(Clone, Debug)]
pub struct Navigator {
    settings: NavSettings,
    speed: f32,
    state: NavState,
    last_chunk: Option<ChunkPos>,
    target_chunk: Option<ChunkPos>,
    waypoints: VecDeque<IVec2>,
    last_check_pos: Option<Vec2>,
    stuck_timer: f32,
    force_replan: bool,
    recoveries: u32,
}

impl Navigator {
    pub fn new(settings: NavSettings, speed: f32) -> Self {
        Self {
            settings: settings.sanitize(),
            speed: speed.max(0.0),
            state: NavState::Idle,
            last_chunk: None,
            target_chunk: None,
            waypoints: VecDeque::new(),
            last_check_pos: None,
            stuck_timer: 0.0,
            force_replan: false,
            recoveries: 0,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn waypoints(&self) -> impl Iterator<Item = IVec2> + '_ {
        self.waypoints.iter().copied()
    }

    pub fn next_waypoint(&self) -> Option<IVec2> {
        self.waypoints.front().copied()
    }

    pub fn final_waypoint(&self) -> Option<IVec2> {
        self.waypoints.back().copied()
    }

    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    /// Returns this tick's displacement.
    pub fn tick(&mut self, ctx: &mut SimulationContext<'_>, current_pos: Vec2, target_pos: Vec2) -> Vec2 {
        let world = &mut *ctx.world;
        let current_cell = world.world_to_grid(current_pos);
        let target_distance = current_pos.distance(target_pos);

        self.check_stuck(world, ctx.delta, current_pos, current_cell, target_distance);

        let chunk = world.chunk_of(current_pos);
        let target_chunk = world.chunk_of(target_pos);
        let needs_plan = self.force_replan
            || self.last_chunk != Some(chunk)
            || self.target_chunk != Some(target_chunk)
            || (self.waypoints.is_empty() && target_distance > self.settings.replan_distance);
        if needs_plan {
            let target_cell = world.world_to_grid(target_pos);
            self.replan(world, current_cell, chunk, target_cell, target_chunk);
        }

        self.steer(world, current_pos, ctx.delta)
    }

    fn check_stuck(
        &mut self,
        world: &mut WorldHandle,
        delta: f32,
        current_pos: Vec2,
        current_cell: IVec2,
        target_distance: f32,
    ) {
        let Some(last) = self.last_check_pos else {
            self.last_check_pos = Some(current_pos);
            self.stuck_timer = 0.0;
            return;
        };

        self.stuck_timer += delta;
        if self.stuck_timer < self.settings.stuck_interval {
            return;
        }
        self.stuck_timer = 0.0;
        self.last_check_pos = Some(current_pos);

        let moved = current_pos.distance(last);
        if moved < self.settings.stuck_epsilon && target_distance > self.settings.replan_distance {
            self.recover(world, current_cell);
        }
    }

    fn recover(&mut self, world: &mut WorldHandle, cell: IVec2) {
        let cleared = RECOVERY_OFFSETS
            .iter()
            .filter(|offset| {
                world.damage_cell(cell + **offset, self.settings.stuck_damage)
                    == Some(DamageOutcome::Destroyed)
            })
            .count();
        debug!("Agent stuck at {cell}, cleared {cleared} occupants");

        self.recoveries += 1;
        self.waypoints.clear();
        self.force_replan = true;
    }

    fn replan(
        &mut self,
        world: &WorldHandle,
        current_cell: IVec2,
        chunk: ChunkPos,
        target_cell: IVec2,
        target_chunk: ChunkPos,
    ) {
        let step = next_chunk_step(chunk, target_chunk);
        let path = match edge_goal(world.mapper(), chunk, step) {
            Some(goal) => {
                let bounds = world.chunk_bounds(chunk).expand(self.settings.edge_margin);
                world.find_path(current_cell, goal, Some(bounds))
            }
            None => world.find_path(current_cell, Goal::Cell(target_cell), None),
        };
        if !path.complete {
            debug!("Planned partial {step:?} path of {} cells from {current_cell}", path.len());
        }

        self.waypoints = path.steps.into_iter().skip(1).collect();
        self.last_chunk = Some(chunk);
        self.target_chunk = Some(target_chunk);
        self.force_replan = false;
        self.state = if self.waypoints.is_empty() {
            NavState::Idle
        } else {
            NavState::Following
        };
    }

    fn steer(&mut self, world: &WorldHandle, current_pos: Vec2, delta: f32) -> Vec2 {
        while let Some(&front) = self.waypoints.front() {
            let to_waypoint = world.grid_to_world(front) - current_pos;
            let distance = to_waypoint.length();
            if distance <= self.settings.arrive_epsilon {
                self.waypoints.pop_front();
                continue;
            }
            let step = (self.speed * delta).min(distance);
            return to_waypoint / distance * step;
        }
        self.state = NavState::Idle;
        Vec2::ZERO
    }
}
