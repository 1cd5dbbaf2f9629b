use std::ops::{Add, AddAssign, Sub, SubAssign};

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::{WorldError, WorldResult};

pub const DEFAULT_CHUNK_SIZE: i32 = 16;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for ChunkPos {
    type Output = ChunkPos;

    fn add(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl AddAssign for ChunkPos {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for ChunkPos {
    type Output = ChunkPos;

    fn sub(self, rhs: Self) -> Self::Output {
        ChunkPos {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl SubAssign for ChunkPos {
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// Inclusive rectangle of grid cells.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub min: IVec2,
    pub max: IVec2,
}

impl GridRect {
    pub fn new(min: IVec2, max: IVec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= self.min.x && cell.x <= self.max.x && cell.y >= self.min.y && cell.y <= self.max.y
    }

    pub fn expand(&self, margin: i32) -> Self {
        Self::new(self.min - IVec2::splat(margin), self.max + IVec2::splat(margin))
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y + 1
    }
}

pub fn div_rem_floor(value: i32, divisor: i32) -> (i32, i32) {
    let mut q = value / divisor;
    let mut r = value % divisor;
    if r < 0 {
        q -= 1;
        r += divisor;
    }
    (q, r)
}

/// Maps between world positions (pixels, origin at the map centre), grid
/// cells and chunks for one world.
///
/// Grid cell `(x, y)` has its centre at
/// `((x - width / 2) * cell_size, (y - height / 2) * cell_size)`; `y` grows
/// downwards, so "north" means decreasing `y`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridMapper {
    width: i32,
    height: i32,
    cell_size: f32,
    chunk_size: i32,
}

impl GridMapper {
    pub fn new(width: i32, height: i32, cell_size: f32, chunk_size: i32) -> WorldResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(WorldError::invalid(format!(
                "world size must be positive, got {width}x{height}"
            )));
        }
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(WorldError::invalid(format!(
                "cell pixel size must be positive, got {cell_size}"
            )));
        }
        if chunk_size <= 0 {
            return Err(WorldError::invalid(format!(
                "chunk size must be positive, got {chunk_size}"
            )));
        }

        Ok(Self {
            width,
            height,
            cell_size,
            chunk_size,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size
    }

    pub fn bounds(&self) -> GridRect {
        GridRect::new(IVec2::ZERO, IVec2::new(self.width - 1, self.height - 1))
    }

    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    pub fn clamp(&self, cell: IVec2) -> IVec2 {
        IVec2::new(
            cell.x.clamp(0, self.width - 1),
            cell.y.clamp(0, self.height - 1),
        )
    }

    fn half_extent(&self) -> Vec2 {
        Vec2::new(self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn grid_to_world(&self, cell: IVec2) -> Vec2 {
        (cell.as_vec2() - self.half_extent()) * self.cell_size
    }

    /// Nearest cell to `pos`, clamped to the grid.
    pub fn world_to_grid(&self, pos: Vec2) -> IVec2 {
        let cell = (pos / self.cell_size + self.half_extent() + Vec2::splat(0.5)).floor();
        // Saturating float->int cast keeps far-away positions finite before clamping.
        self.clamp(IVec2::new(cell.x as i32, cell.y as i32))
    }

    pub fn chunk_of_cell(&self, cell: IVec2) -> ChunkPos {
        let (x, _) = div_rem_floor(cell.x, self.chunk_size);
        let (y, _) = div_rem_floor(cell.y, self.chunk_size);
        ChunkPos { x, y }
    }

    pub fn chunk_of(&self, pos: Vec2) -> ChunkPos {
        self.chunk_of_cell(self.world_to_grid(pos))
    }

    /// Cells covered by `chunk`, without clipping to the grid.
    pub fn chunk_bounds(&self, chunk: ChunkPos) -> GridRect {
        let min = IVec2::new(chunk.x * self.chunk_size, chunk.y * self.chunk_size);
        GridRect::new(min, min + IVec2::splat(self.chunk_size - 1))
    }
}
