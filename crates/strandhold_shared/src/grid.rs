use glam::IVec2;
use serde::{Deserialize, Serialize};

use crate::occupant::Occupant;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BiomeId(pub u8);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Water,
    Sand,
    Biome(BiomeId),
}

impl Terrain {
    pub fn is_water(self) -> bool {
        self == Terrain::Water
    }

    pub fn is_shore(self) -> bool {
        matches!(self, Terrain::Water | Terrain::Sand)
    }

    pub fn biome(self) -> Option<BiomeId> {
        match self {
            Terrain::Biome(id) => Some(id),
            _ => None,
        }
    }
}

/// Row-major `width x height` array addressed by grid cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: i32,
    height: i32,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn new_filled(width: i32, height: i32, value: T) -> Self {
        let len = width.max(0) as usize * height.max(0) as usize;
        Self {
            width: width.max(0),
            height: height.max(0),
            cells: vec![value; len],
        }
    }
}

impl<T> Grid<T> {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    fn index(&self, cell: IVec2) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.y as usize * self.width as usize + cell.x as usize)
    }

    pub fn get(&self, cell: IVec2) -> Option<&T> {
        self.index(cell).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, cell: IVec2) -> Option<&mut T> {
        self.index(cell).map(|i| &mut self.cells[i])
    }

    /// Writes `value` and returns the previous one; out-of-grid writes are dropped.
    pub fn set(&mut self, cell: IVec2, value: T) -> Option<T> {
        let index = self.index(cell)?;
        Some(std::mem::replace(&mut self.cells[index], value))
    }

    pub fn cells(&self) -> impl Iterator<Item = (IVec2, &T)> + '_ {
        let width = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, value)| (IVec2::new(i as i32 % width, i as i32 / width), value))
    }

    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

pub type TerrainGrid = Grid<Terrain>;

pub type OverlayGrid = Grid<Option<Occupant>>;

impl OverlayGrid {
    pub fn empty(width: i32, height: i32) -> Self {
        Grid::new_filled(width, height, None)
    }

    /// Out-of-grid cells are reported as unoccupied.
    pub fn is_occupied(&self, cell: IVec2) -> bool {
        matches!(self.get(cell), Some(Some(_)))
    }

    pub fn occupant(&self, cell: IVec2) -> Option<&Occupant> {
        self.get(cell).and_then(Option::as_ref)
    }

    pub fn occupant_mut(&mut self, cell: IVec2) -> Option<&mut Occupant> {
        self.get_mut(cell).and_then(Option::as_mut)
    }

    pub fn take(&mut self, cell: IVec2) -> Option<Occupant> {
        self.get_mut(cell).and_then(Option::take)
    }

    pub fn occupied_count(&self) -> usize {
        self.as_slice().iter().filter(|slot| slot.is_some()).count()
    }
}
