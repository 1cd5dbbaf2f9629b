use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use strandhold_shared::{WorldError, WorldResult, WorldSettings};

/// Gameplay tuning for the headless simulation, stored in the `[simulation]`
/// table of the settings file next to the world parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_spawn_interval")]
    pub spawn_interval: f32,
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f32,
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,
    #[serde(default = "default_agent_speed")]
    pub agent_speed: f32,
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,
    #[serde(default = "default_attack_damage")]
    pub attack_damage: u32,
    #[serde(default = "default_base_health")]
    pub base_health: u32,
    /// Worker threads for background jobs; 0 lets rayon decide.
    #[serde(default)]
    pub job_threads: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            spawn_interval: default_spawn_interval(),
            spawn_radius: default_spawn_radius(),
            max_agents: default_max_agents(),
            agent_speed: default_agent_speed(),
            attack_range: default_attack_range(),
            attack_damage: default_attack_damage(),
            base_health: default_base_health(),
            job_threads: 0,
        }
    }
}

impl SimulationSettings {
    pub fn sanitize(mut self) -> Self {
        self.spawn_interval = self.spawn_interval.max(0.1);
        self.spawn_radius = self.spawn_radius.max(0.0);
        self.agent_speed = self.agent_speed.max(0.0);
        self.attack_range = self.attack_range.max(1.0);
        self.base_health = self.base_health.max(1);
        self.job_threads = self.job_threads.min(64);
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SimulationSection {
    #[serde(default)]
    simulation: SimulationSettings,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimConfig {
    pub world: WorldSettings,
    pub simulation: SimulationSettings,
}

impl SimConfig {
    pub fn from_toml_str(contents: &str, path: &Path) -> WorldResult<Self> {
        let world = WorldSettings::from_toml_str(contents, path)?;
        let section = toml::from_str::<SimulationSection>(contents).map_err(|source| {
            WorldError::ParseSettings {
                path: path.to_path_buf(),
                source,
            }
        })?;
        Ok(Self {
            world,
            simulation: section.simulation.sanitize(),
        })
    }

    pub fn load(path: &Path) -> WorldResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    pub fn to_toml_string(&self) -> WorldResult<String> {
        let mut out = self.world.to_toml_string()?;
        let section = SimulationSection {
            simulation: self.simulation.clone(),
        };
        out.push('\n');
        out.push_str(&toml::to_string_pretty(&section)?);
        Ok(out)
    }

    pub fn save(&self, path: &Path) -> WorldResult<()> {
        let serialized = self.to_toml_string()?;
        fs::write(path, serialized).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn load_or_create_config(path: &Path) -> SimConfig {
    match SimConfig::load(path) {
        Ok(config) => config,
        Err(err) if err.is_not_found() => {
            let config = SimConfig::default();
            if let Err(save_err) = config.save(path) {
                warn!(
                    "Failed to create default settings at {}: {save_err}",
                    path.display()
                );
            }
            config
        }
        Err(err) => {
            // Keep the broken file so it can be fixed by hand.
            warn!("Failed to load settings from {}: {err}", path.display());
            SimConfig::default()
        }
    }
}

fn default_spawn_interval() -> f32 {
    10.0
}

fn default_spawn_radius() -> f32 {
    1_500.0
}

fn default_max_agents() -> usize {
    64
}

fn default_agent_speed() -> f32 {
    96.0
}

fn default_attack_range() -> f32 {
    40.0
}

fn default_attack_damage() -> u32 {
    10
}

fn default_base_health() -> u32 {
    200
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{SimConfig, SimulationSettings};

    #[test]
    fn round_trip_keeps_both_sections() {
        let mut config = SimConfig::default();
        config.world.seed = 99;
        config.world.generation.width = 48;
        config.simulation.spawn_radius = 640.0;
        config.simulation.max_agents = 3;

        let text = config.to_toml_string().expect("serialize config");
        let parsed = SimConfig::from_toml_str(&text, Path::new("strandhold.toml")).expect("parse config");
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_simulation_table_uses_defaults() {
        let parsed = SimConfig::from_toml_str("seed = \"7\"\n", Path::new("strandhold.toml"))
            .expect("parse config");
        assert_eq!(parsed.world.seed, 7);
        assert_eq!(parsed.simulation, SimulationSettings::default());
    }

    #[test]
    fn simulation_values_are_sanitized() {
        let parsed = SimConfig::from_toml_str(
            "[simulation]\nspawn_interval = -4.0\nbase_health = 0\n",
            Path::new("strandhold.toml"),
        )
        .expect("parse config");
        assert!(parsed.simulation.spawn_interval > 0.0);
        assert_eq!(parsed.simulation.base_health, 1);
    }

    #[test]
    fn load_or_create_writes_defaults_for_missing_file() {
        let dir = std::env::temp_dir().join(format!("strandhold-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("strandhold.toml");
        let _ = std::fs::remove_file(&path);

        let config = super::load_or_create_config(&path);
        assert_eq!(config, SimConfig::default());
        assert!(path.exists());
        assert_eq!(SimConfig::load(&path).expect("reload config"), config);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
