//! Entities that can sit on the overlay grid.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::grid::Terrain;

pub const RESOURCE_DECREASE_RATE: f32 = 0.9;
pub const RESOURCE_DESTROY_THRESHOLD: f32 = 0.25;
pub const TREE_APPLE_PROBABILITY: f64 = 0.1;
pub const APPLE_DROP_PROBABILITY: f64 = 0.4;
pub const IRON_ORE_DROP_PROBABILITY: f64 = 0.14;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Tree,
    Rock,
}

impl ResourceKind {
    /// Placement priority during generation.
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Tree, ResourceKind::Rock];

    pub fn can_grow_on(self, terrain: Terrain) -> bool {
        match self {
            ResourceKind::Tree => terrain.biome().is_some(),
            ResourceKind::Rock => !terrain.is_water(),
        }
    }

    fn sprite_px_range(self) -> (u16, u16) {
        match self {
            ResourceKind::Tree => (64, 96),
            ResourceKind::Rock => (48, 64),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub kind: ResourceKind,
    /// Remaining fraction of the original size, shrinks with every hit.
    pub size: f32,
    pub sprite_px: u16,
    pub has_apple: bool,
    pub hits: u32,
}

impl ResourceNode {
    pub fn roll(kind: ResourceKind, rng: &mut impl Rng) -> Self {
        let (min_px, max_px) = kind.sprite_px_range();
        let sprite_px = rng.gen_range(min_px..=max_px);
        let has_apple = kind == ResourceKind::Tree && rng.gen_bool(TREE_APPLE_PROBABILITY);
        Self {
            kind,
            size: 1.0,
            sprite_px,
            has_apple,
            hits: 0,
        }
    }

    pub fn is_depleted(&self) -> bool {
        self.size <= RESOURCE_DESTROY_THRESHOLD
    }

    fn hit(&mut self) {
        self.size *= RESOURCE_DECREASE_RATE;
        self.hits = self.hits.saturating_add(1);
    }

    /// One mining hit. Drops are drawn from `rng`.
    pub fn mine(&mut self, rng: &mut impl Rng) -> HarvestYield {
        self.hit();
        let mut drops = Vec::with_capacity(2);
        match self.kind {
            ResourceKind::Tree => {
                drops.push((ItemKind::Log, 1));
                if self.has_apple && rng.gen_bool(APPLE_DROP_PROBABILITY) {
                    drops.push((ItemKind::Apple, 1));
                }
            }
            ResourceKind::Rock => {
                drops.push((ItemKind::Stone, 1));
                if rng.gen_bool(IRON_ORE_DROP_PROBABILITY) {
                    drops.push((ItemKind::IronOre, rng.gen_range(1..=2)));
                }
            }
        }
        HarvestYield {
            drops,
            depleted: self.is_depleted(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Wood,
    Stone,
}

impl BlockKind {
    pub fn durability(self) -> u32 {
        match self {
            BlockKind::Wood => 50,
            BlockKind::Stone => 65,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedBlock {
    pub kind: BlockKind,
    pub durability: u32,
}

impl PlacedBlock {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            durability: kind.durability(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Log,
    Apple,
    Stone,
    IronOre,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarvestYield {
    pub drops: Vec<(ItemKind, u8)>,
    pub depleted: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    Survived,
    Destroyed,
    Indestructible,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Occupant {
    Resource(ResourceNode),
    Block(PlacedBlock),
    Obstacle,
}

impl Occupant {
    pub fn is_destructible(&self) -> bool {
        !matches!(self, Occupant::Obstacle)
    }

    pub fn tag(&self) -> OccupantTag {
        match self {
            Occupant::Resource(node) => OccupantTag::Resource(node.kind),
            Occupant::Block(block) => OccupantTag::Block(block.kind),
            Occupant::Obstacle => OccupantTag::Obstacle,
        }
    }

    /// Resources take `amount` mining hits, blocks lose `amount` durability.
    pub fn damage(&mut self, amount: u32) -> DamageOutcome {
        match self {
            Occupant::Resource(node) => {
                for _ in 0..amount {
                    if node.is_depleted() {
                        break;
                    }
                    node.hit();
                }
                if node.is_depleted() {
                    DamageOutcome::Destroyed
                } else {
                    DamageOutcome::Survived
                }
            }
            Occupant::Block(block) => {
                block.durability = block.durability.saturating_sub(amount);
                if block.durability == 0 {
                    DamageOutcome::Destroyed
                } else {
                    DamageOutcome::Survived
                }
            }
            Occupant::Obstacle => DamageOutcome::Indestructible,
        }
    }
}

/// Payload-free description of an occupant, used for filtering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OccupantTag {
    Resource(ResourceKind),
    Block(BlockKind),
    Obstacle,
}
