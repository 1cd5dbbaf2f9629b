use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::{IVec2, Vec2};
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use strandhold_core::events::EventReceiver;
use strandhold_core::jobs::{JobSystem, TaskHandle, ThreadPoolBuildError};
use strandhold_shared::{
    generate_world, BlockKind, ItemKind, PlacementError, Rect, Scene, SimulationContext, WorldHandle, WorldResult,
};

use crate::agent::{Agent, AgentOutcome, Base, AGENT_HALF_EXTENT};
use crate::commands::Command;
use crate::config::{SimConfig, SimulationSettings};
use crate::scene::SceneRegistry;
use crate::spawner::EnemySpawner;

pub const TICK_RATE: u32 = 20;
pub const TICK_DURATION: Duration = Duration::from_millis(1000 / TICK_RATE as u64);
const LOADING_LOG_INTERVAL_TICKS: u64 = TICK_RATE as u64 * 2;
const STATUS_LOG_INTERVAL_TICKS: u64 = TICK_RATE as u64 * 30;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to start job system: {0}")]
    JobSystem(#[from] ThreadPoolBuildError),
}

/// Game state that only exists once the world has been published.
struct GameState {
    world: WorldHandle,
    scene: SceneRegistry,
    agents: Vec<Agent>,
    spawner: EnemySpawner,
    base: Base,
    inventory: FxHashMap<ItemKind, u32>,
}

enum Phase {
    Loading {
        task: TaskHandle<WorldResult<WorldHandle>>,
        started: Instant,
    },
    Running(Box<GameState>),
    GameOver(Box<GameState>),
    Failed,
}

pub struct Simulation {
    config: SimConfig,
    _jobs: JobSystem,
    phase: Phase,
    tick: u64,
    elapsed: f64,
    running: Arc<AtomicBool>,
    command_rx: EventReceiver<Command>,
}

impl Simulation {
    /// Starts generating the world in the background; the simulation stays in
    /// its loading phase until the result is published.
    pub fn new(
        config: SimConfig,
        running: Arc<AtomicBool>,
        command_rx: EventReceiver<Command>,
    ) -> Result<Self, SimError> {
        let threads = match config.simulation.job_threads {
            0 => None,
            count => Some(count),
        };
        let jobs = JobSystem::new(threads)?;

        let world_settings = config.world.clone();
        let task = jobs.spawn_task(move || generate_world(&world_settings));
        info!(
            "Generating {}x{} world with seed {} on {} worker thread(s)",
            config.world.generation.width,
            config.world.generation.height,
            config.world.seed,
            jobs.num_threads()
        );

        Ok(Self {
            config,
            _jobs: jobs,
            phase: Phase::Loading {
                task,
                started: Instant::now(),
            },
            tick: 0,
            elapsed: 0.0,
            running,
            command_rx,
        })
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self.phase, Phase::GameOver(_))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn agent_count(&self) -> usize {
        self.state().map_or(0, |state| state.agents.len())
    }

    pub fn base_health(&self) -> Option<u32> {
        self.state().map(|state| state.base.health)
    }

    pub fn world(&self) -> Option<&WorldHandle> {
        self.state().map(|state| &state.world)
    }

    pub fn item_count(&self, item: ItemKind) -> u32 {
        self.state()
            .and_then(|state| state.inventory.get(&item).copied())
            .unwrap_or(0)
    }

    fn state(&self) -> Option<&GameState> {
        match &self.phase {
            Phase::Running(state) | Phase::GameOver(state) => Some(state),
            Phase::Loading { .. } | Phase::Failed => None,
        }
    }

    /// Fixed-rate loop until `running` is cleared or `max_ticks` have run.
    pub fn run(&mut self, max_ticks: Option<u64>) {
        info!("Starting simulation at {TICK_RATE} ticks per second");
        let delta = TICK_DURATION.as_secs_f32();

        while self.is_running() {
            let tick_start = Instant::now();

            self.step(delta);
            if max_ticks.is_some_and(|limit| self.tick >= limit) {
                info!("Reached tick limit of {}", self.tick);
                break;
            }

            let elapsed = tick_start.elapsed();
            if elapsed < TICK_DURATION {
                std::thread::sleep(TICK_DURATION - elapsed);
            }
        }

        self.log_status();
        info!("Simulation stopped after {} ticks", self.tick);
    }

    /// One tick of `delta` seconds.
    pub fn step(&mut self, delta: f32) {
        self.handle_console_commands();
        if !self.is_running() {
            return;
        }

        if self.is_loading() {
            self.poll_loading();
        } else if let Phase::Running(state) = &mut self.phase {
            advance(state, &self.config.simulation, delta, self.elapsed, self.tick);
            if state.base.is_destroyed() {
                warn!("Base destroyed at tick {}", self.tick);
                self.finish_game();
            }
        }

        self.tick += 1;
        self.elapsed += f64::from(delta);
        if self.tick % STATUS_LOG_INTERVAL_TICKS == 0 {
            self.log_status();
        }
    }

    fn poll_loading(&mut self) {
        let Phase::Loading { task, started } = &mut self.phase else {
            return;
        };
        let waited = started.elapsed();
        let polled = task.poll();
        let lost = task.is_lost();

        match polled {
            Some(Ok(world)) => {
                info!("World ready after {waited:.1?}");
                let state = self.publish(world);
                self.phase = Phase::Running(Box::new(state));
            }
            Some(Err(err)) => {
                error!("World generation failed: {err}");
                self.phase = Phase::Failed;
                self.running.store(false, Ordering::SeqCst);
            }
            None if lost => {
                error!("World generation job died without a result");
                self.phase = Phase::Failed;
                self.running.store(false, Ordering::SeqCst);
            }
            None => {
                if self.tick % LOADING_LOG_INTERVAL_TICKS == 0 {
                    info!("Loading world...");
                }
            }
        }
    }

    fn publish(&self, world: WorldHandle) -> GameState {
        let mut scene = SceneRegistry::new(*world.mapper());
        for (cell, slot) in world.overlay().cells() {
            if slot.is_some() {
                let entity = scene.allocate();
                scene.register(entity, cell);
            }
        }
        debug!("Registered {} overlay entities", scene.len());

        let settings = &self.config.simulation;
        GameState {
            spawner: EnemySpawner::new(world.seed(), settings.spawn_interval, settings.spawn_radius),
            base: Base::new(settings.base_health),
            scene,
            world,
            agents: Vec::new(),
            inventory: FxHashMap::default(),
        }
    }

    fn finish_game(&mut self) {
        let phase = std::mem::replace(&mut self.phase, Phase::Failed);
        self.phase = match phase {
            Phase::Running(state) => Phase::GameOver(state),
            other => other,
        };
        self.running.store(false, Ordering::SeqCst);
    }

    fn handle_console_commands(&mut self) {
        for command in self.command_rx.drain() {
            self.execute_console_command(command);
        }
    }

    fn execute_console_command(&mut self, command: Command) {
        match command {
            Command::Noop => {}
            Command::Stop => {
                info!("Shutdown requested via console /stop");
                self.running.store(false, Ordering::SeqCst);
            }
            Command::Status => self.log_status(),
            Command::Help => log_help(),
            Command::InvalidUsage(message) => warn!("[CONSOLE] {message}"),
            Command::Unknown(input) => warn!("[CONSOLE] unknown command '{input}' (try /help)"),
            Command::Spawn(count) => {
                let Phase::Running(state) = &mut self.phase else {
                    warn!("[CONSOLE] /spawn is unavailable while the world is not running");
                    return;
                };
                // Stops at the enemy cap or the first spawn without a free cell.
                let spawned = (0..count)
                    .take_while(|_| spawn_agent(state, &self.config.simulation))
                    .count();
                info!("[CONSOLE] spawned {spawned} of {count} enemies");
            }
            Command::Harvest(cell) => {
                let Phase::Running(state) = &mut self.phase else {
                    warn!("[CONSOLE] /harvest is unavailable while the world is not running");
                    return;
                };
                match state.world.harvest(cell) {
                    Some(harvest) => {
                        for (item, count) in &harvest.drops {
                            *state.inventory.entry(*item).or_insert(0) += u32::from(*count);
                        }
                        info!(
                            "[CONSOLE] harvested {cell}: {:?}{}",
                            harvest.drops,
                            if harvest.depleted { " (depleted)" } else { "" }
                        );
                        sync_removals(state);
                    }
                    None => warn!("[CONSOLE] nothing to harvest at {cell}"),
                }
            }
            Command::Place { cell, kind } => {
                let Phase::Running(state) = &mut self.phase else {
                    warn!("[CONSOLE] /place is unavailable while the world is not running");
                    return;
                };
                match place_block(state, cell, kind) {
                    Ok(()) => info!("[CONSOLE] placed {kind:?} block at {cell}"),
                    Err(err) => warn!("[CONSOLE] /place failed: {err}"),
                }
            }
        }
    }

    fn log_status(&self) {
        match &self.phase {
            Phase::Loading { started, .. } => {
                info!("[STATUS] tick {}: loading world ({:.1?})", self.tick, started.elapsed());
            }
            Phase::Failed => info!("[STATUS] tick {}: world unavailable", self.tick),
            Phase::Running(state) | Phase::GameOver(state) => {
                info!(
                    "[STATUS] tick {}: base {}/{}, {} enemies, {} resources, inventory {:?}{}",
                    self.tick,
                    state.base.health,
                    state.base.max_health,
                    state.agents.len(),
                    state.world.overlay().occupied_count(),
                    state.inventory,
                    if self.is_game_over() { " (game over)" } else { "" }
                );
            }
        }
    }
}

fn advance(state: &mut GameState, settings: &SimulationSettings, delta: f32, elapsed: f64, tick: u64) {
    sync_removals(state);
    state
        .scene
        .rebuild_collisions(tick, state.agents.iter().map(|agent| (agent.id, agent.bounds())));

    if state.spawner.tick(delta) {
        spawn_agent(state, settings);
    }

    let base_position = Vec2::ZERO;
    let mut reached = Vec::new();
    for (index, agent) in state.agents.iter_mut().enumerate() {
        let mut ctx = SimulationContext::new(delta, elapsed, tick, &mut state.world);
        if agent.update(&mut ctx, base_position, settings.attack_range) == AgentOutcome::ReachedBase {
            reached.push(index);
        }
    }

    for index in reached.into_iter().rev() {
        let agent = state.agents.swap_remove(index);
        state.base.take_damage(settings.attack_damage);
        info!(
            "Enemy {:?} reached the base: {}/{} health left",
            agent.id, state.base.health, state.base.max_health
        );
    }

    sync_removals(state);
}

/// Unregisters everything the world removed since the last call.
fn sync_removals(state: &mut GameState) {
    for removed in state.world.drain_removed() {
        state.scene.unregister_cell(removed.cell);
    }
}

fn spawn_agent(state: &mut GameState, settings: &SimulationSettings) -> bool {
    if state.agents.len() >= settings.max_agents {
        debug!("Enemy cap of {} reached", settings.max_agents);
        return false;
    }
    let half = Vec2::splat(AGENT_HALF_EXTENT);
    let Some(position) = state
        .spawner
        .pick_spawn_point(&state.world, state.scene.collisions(), half)
    else {
        debug!("No free spawn point found");
        return false;
    };

    let id = state.scene.allocate();
    let agent = Agent::new(id, position, state.world.nav_settings().clone(), settings.agent_speed);
    // Later spawns this tick must not land on top of this one.
    state.scene.add_collider(agent.id, agent.bounds());
    debug!("Spawned enemy {id:?} at {position}");
    state.agents.push(agent);
    true
}

fn place_block(state: &mut GameState, cell: IVec2, kind: BlockKind) -> Result<(), PlacementError> {
    let rect = Rect::from_center(state.world.grid_to_world(cell), state.scene.cell_half_extent());
    if state.scene.collision_query(rect, None).is_some() {
        return Err(PlacementError::Occupied);
    }
    state.world.place_block(cell, kind)?;
    let entity = state.scene.allocate();
    state.scene.register(entity, cell);
    state.scene.add_collider(entity, rect);
    Ok(())
}

fn log_help() {
    info!("[CONSOLE] Available commands:");
    info!("[CONSOLE]   /help");
    info!("[CONSOLE]   /status");
    info!("[CONSOLE]   /spawn [count]");
    info!("[CONSOLE]   /harvest <x> <y>");
    info!("[CONSOLE]   /place <x> <y> <wood|stone>");
    info!("[CONSOLE]   /stop");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use glam::IVec2;
    use strandhold_core::events::{self, EventSender};
    use strandhold_shared::{BlockKind, ItemKind, Occupant};

    use super::Simulation;
    use crate::commands::Command;
    use crate::config::SimConfig;

    fn open_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.world.seed = 31;
        config.world.generation.width = 40;
        config.world.generation.height = 40;
        config.world.generation.water_threshold = -2.0;
        config.world.generation.tree_zone_threshold = 2.0;
        config.world.generation.rock_zone_threshold = 2.0;
        config.simulation.job_threads = 1;
        config
    }

    fn loaded(config: SimConfig) -> (Simulation, EventSender<Command>) {
        let (tx, rx) = events::channel();
        let running = Arc::new(AtomicBool::new(true));
        let mut sim = Simulation::new(config, running, rx).expect("start simulation");

        let deadline = Instant::now() + Duration::from_secs(30);
        while sim.is_loading() {
            assert!(Instant::now() < deadline, "world never finished loading");
            sim.step(0.05);
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(sim.world().is_some());
        (sim, tx)
    }

    #[test]
    fn console_commands_edit_the_world() {
        let mut config = open_config();
        config.simulation.spawn_interval = 1_000.0;
        config.simulation.spawn_radius = 600.0;
        let (mut sim, tx) = loaded(config);

        tx.send(Command::Place {
            cell: IVec2::new(3, 4),
            kind: BlockKind::Stone,
        })
        .expect("send command");
        tx.send(Command::Harvest(IVec2::new(6, 6))).expect("send command");
        tx.send(Command::Spawn(2)).expect("send command");
        sim.step(0.05);

        let world = sim.world().expect("world loaded");
        assert!(matches!(
            world.overlay().occupant(IVec2::new(3, 4)),
            Some(Occupant::Block(_))
        ));
        // An enemy that happens to spawn next to the base attacks at once.
        let attacks = (200 - sim.base_health().expect("base exists")) / 10;
        assert_eq!(sim.agent_count() + attacks as usize, 2);
        assert_eq!(sim.item_count(ItemKind::Log), 0);

        tx.send(Command::Stop).expect("send command");
        sim.step(0.05);
        assert!(!sim.is_running());
    }

    #[test]
    fn spawn_command_stops_at_the_enemy_cap() {
        let mut config = open_config();
        config.simulation.spawn_interval = 1_000.0;
        config.simulation.spawn_radius = 600.0;
        config.simulation.max_agents = 2;
        let (mut sim, tx) = loaded(config);

        let started = Instant::now();
        tx.send(Command::Spawn(u32::MAX)).expect("send command");
        sim.step(0.05);

        assert!(started.elapsed() < Duration::from_secs(5));
        let attacks = (200 - sim.base_health().expect("base exists")) / 10;
        assert_eq!(sim.agent_count() + attacks as usize, 2);
    }

    #[test]
    fn enemies_at_the_base_end_the_game() {
        let mut config = open_config();
        config.simulation.spawn_radius = 0.0;
        config.simulation.base_health = 10;
        config.simulation.attack_damage = 10;
        let (mut sim, tx) = loaded(config);
        assert_eq!(sim.base_health(), Some(10));

        tx.send(Command::Spawn(1)).expect("send command");
        sim.step(0.05);

        assert!(sim.is_game_over());
        assert_eq!(sim.base_health(), Some(0));
        assert_eq!(sim.agent_count(), 0);
        assert!(!sim.is_running());
    }
}
