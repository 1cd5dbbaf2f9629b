use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coords::DEFAULT_CHUNK_SIZE;
use crate::error::{WorldError, WorldResult};

pub const MAX_BIOMES: usize = 256;

/// Every knob the world generator reads. The seed lives next to it in
/// [`WorldSettings`]; together they fully determine a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_width")]
    pub width: i32,
    #[serde(default = "default_height")]
    pub height: i32,
    #[serde(default = "default_biomes")]
    pub biomes: Vec<String>,
    #[serde(default = "default_cell_pixel_size")]
    pub cell_pixel_size: f32,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: i32,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_water_threshold")]
    pub water_threshold: f64,
    #[serde(default = "default_beach_width")]
    pub beach_width: i32,
    #[serde(default = "default_biome_cell_size")]
    pub biome_cell_size: i32,
    #[serde(default = "default_minkowski_exponent")]
    pub minkowski_exponent: f64,
    #[serde(default = "default_forest_size_scale")]
    pub forest_size_scale: f64,
    #[serde(default = "default_forest_density_scale")]
    pub forest_density_scale: f64,
    #[serde(default = "default_tree_zone_threshold")]
    pub tree_zone_threshold: f64,
    #[serde(default = "default_tree_density_threshold")]
    pub tree_density_threshold: f64,
    #[serde(default = "default_rock_size_scale")]
    pub rock_size_scale: f64,
    #[serde(default = "default_rock_density_scale")]
    pub rock_density_scale: f64,
    #[serde(default = "default_rock_zone_threshold")]
    pub rock_zone_threshold: f64,
    #[serde(default = "default_rock_density_threshold")]
    pub rock_density_threshold: f64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            biomes: default_biomes(),
            cell_pixel_size: default_cell_pixel_size(),
            chunk_size: default_chunk_size(),
            scale: default_scale(),
            water_threshold: default_water_threshold(),
            beach_width: default_beach_width(),
            biome_cell_size: default_biome_cell_size(),
            minkowski_exponent: default_minkowski_exponent(),
            forest_size_scale: default_forest_size_scale(),
            forest_density_scale: default_forest_density_scale(),
            tree_zone_threshold: default_tree_zone_threshold(),
            tree_density_threshold: default_tree_density_threshold(),
            rock_size_scale: default_rock_size_scale(),
            rock_density_scale: default_rock_density_scale(),
            rock_zone_threshold: default_rock_zone_threshold(),
            rock_density_threshold: default_rock_density_threshold(),
        }
    }
}

impl GenerationSettings {
    pub fn validate(&self) -> WorldResult<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(WorldError::invalid(format!(
                "world size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.biomes.is_empty() {
            return Err(WorldError::invalid("biome palette is empty"));
        }
        if self.biomes.len() > MAX_BIOMES {
            return Err(WorldError::invalid(format!(
                "at most {MAX_BIOMES} biomes are supported, got {}",
                self.biomes.len()
            )));
        }
        if self.chunk_size <= 0 {
            return Err(WorldError::invalid(format!(
                "chunk size must be positive, got {}",
                self.chunk_size
            )));
        }
        if self.biome_cell_size <= 0 {
            return Err(WorldError::invalid(format!(
                "biome cell size must be positive, got {}",
                self.biome_cell_size
            )));
        }
        if self.beach_width < 0 {
            return Err(WorldError::invalid(format!(
                "beach width cannot be negative, got {}",
                self.beach_width
            )));
        }
        if !(self.cell_pixel_size.is_finite() && self.cell_pixel_size > 0.0) {
            return Err(WorldError::invalid(format!(
                "cell pixel size must be positive, got {}",
                self.cell_pixel_size
            )));
        }
        if !(self.minkowski_exponent.is_finite() && self.minkowski_exponent >= 1.0) {
            return Err(WorldError::invalid(format!(
                "minkowski exponent must be >= 1, got {}",
                self.minkowski_exponent
            )));
        }
        for (name, scale) in [
            ("scale", self.scale),
            ("forest_size_scale", self.forest_size_scale),
            ("forest_density_scale", self.forest_density_scale),
            ("rock_size_scale", self.rock_size_scale),
            ("rock_density_scale", self.rock_density_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(WorldError::invalid(format!(
                    "{name} must be positive, got {scale}"
                )));
            }
        }
        Ok(())
    }
}

/// Tuning for the per-agent chunk navigator. Distances are in world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavSettings {
    #[serde(default = "default_arrive_epsilon")]
    pub arrive_epsilon: f32,
    #[serde(default = "default_replan_distance")]
    pub replan_distance: f32,
    #[serde(default = "default_edge_margin")]
    pub edge_margin: i32,
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,
    #[serde(default = "default_stuck_interval")]
    pub stuck_interval: f32,
    #[serde(default = "default_stuck_epsilon")]
    pub stuck_epsilon: f32,
    #[serde(default = "default_stuck_damage")]
    pub stuck_damage: u32,
}

impl Default for NavSettings {
    fn default() -> Self {
        Self {
            arrive_epsilon: default_arrive_epsilon(),
            replan_distance: default_replan_distance(),
            edge_margin: default_edge_margin(),
            max_expansions: default_max_expansions(),
            stuck_interval: default_stuck_interval(),
            stuck_epsilon: default_stuck_epsilon(),
            stuck_damage: default_stuck_damage(),
        }
    }
}

impl NavSettings {
    pub fn sanitize(mut self) -> Self {
        self.arrive_epsilon = self.arrive_epsilon.max(0.01);
        self.replan_distance = self.replan_distance.max(self.arrive_epsilon);
        // The facing edge of the next chunk lies one cell outside the current one.
        self.edge_margin = self.edge_margin.clamp(1, 8);
        self.max_expansions = self.max_expansions.max(1);
        self.stuck_interval = self.stuck_interval.max(0.1);
        self.stuck_epsilon = self.stuck_epsilon.max(0.0);
        self
    }
}

/// Contents of a world settings file. Worlds are regenerated from this on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    #[serde(default = "default_seed", with = "world_seed_serde")]
    pub seed: u64,
    #[serde(default)]
    pub generation: GenerationSettings,
    #[serde(default)]
    pub navigation: NavSettings,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            generation: GenerationSettings::default(),
            navigation: NavSettings::default(),
        }
    }
}

impl WorldSettings {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str, path: &Path) -> WorldResult<Self> {
        let mut parsed = toml::from_str::<Self>(contents).map_err(|source| WorldError::ParseSettings {
            path: path.to_path_buf(),
            source,
        })?;
        parsed.navigation = parsed.navigation.sanitize();
        parsed.generation.validate()?;
        Ok(parsed)
    }

    pub fn load(path: &Path) -> WorldResult<Self> {
        let contents = fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    pub fn to_toml_string(&self) -> WorldResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> WorldResult<()> {
        let serialized = self.to_toml_string()?;
        fs::write(path, serialized).map_err(|source| WorldError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_seed() -> u64 {
    500
}

fn default_width() -> i32 {
    150
}

fn default_height() -> i32 {
    150
}

fn default_biomes() -> Vec<String> {
    vec!["dark_grass".to_string(), "grass".to_string()]
}

fn default_cell_pixel_size() -> f32 {
    32.0
}

fn default_chunk_size() -> i32 {
    DEFAULT_CHUNK_SIZE
}

fn default_scale() -> f64 {
    33.0
}

fn default_water_threshold() -> f64 {
    -0.5
}

fn default_beach_width() -> i32 {
    3
}

fn default_biome_cell_size() -> i32 {
    20
}

fn default_minkowski_exponent() -> f64 {
    2.0
}

fn default_forest_size_scale() -> f64 {
    12.5
}

fn default_forest_density_scale() -> f64 {
    1.3
}

fn default_tree_zone_threshold() -> f64 {
    0.3
}

fn default_tree_density_threshold() -> f64 {
    0.3
}

fn default_rock_size_scale() -> f64 {
    9.0
}

fn default_rock_density_scale() -> f64 {
    0.9
}

fn default_rock_zone_threshold() -> f64 {
    0.3
}

fn default_rock_density_threshold() -> f64 {
    0.45
}

fn default_arrive_epsilon() -> f32 {
    4.0
}

fn default_replan_distance() -> f32 {
    48.0
}

fn default_edge_margin() -> i32 {
    2
}

fn default_max_expansions() -> usize {
    2_000
}

fn default_stuck_interval() -> f32 {
    3.0
}

fn default_stuck_epsilon() -> f32 {
    8.0
}

fn default_stuck_damage() -> u32 {
    1_000
}

// TOML integers are signed 64-bit, so seeds are written as strings.
mod world_seed_serde {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SeedVisitor;

        impl<'de> Visitor<'de> for SeedVisitor {
            type Value = u64;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a u64 seed as an integer or string")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
                Ok(value)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
                u64::try_from(value).map_err(|_| E::custom(format!("seed cannot be negative: {value}")))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
                value
                    .trim()
                    .parse::<u64>()
                    .map_err(|err| E::custom(format!("invalid seed '{value}': {err}")))
            }
        }

        deserializer.deserialize_any(SeedVisitor)
    }
}
