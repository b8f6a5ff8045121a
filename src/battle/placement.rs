//! Static building placement for ground battles
//!
//! Cells covered by buildings and other fixed structures. Lookups are O(1);
//! the grid never changes during a tick.

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::battle::location::Location;

/// Rectangular structure footprint, `width` x `height` cells from `origin`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub origin: Location,
    pub width: i32,
    pub height: i32,
}

impl Structure {
    pub fn cells(&self) -> impl Iterator<Item = Location> + '_ {
        (0..self.height).flat_map(move |dy| {
            (0..self.width).map(move |dx| self.origin.delta(dx, dy))
        })
    }
}

/// Set of cells blocked by placed structures
#[derive(Debug, Clone, Default)]
pub struct PlacementGrid {
    cells: AHashSet<Location>,
}

impl PlacementGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_structures(structures: &[Structure]) -> Self {
        let mut grid = Self::new();
        for structure in structures {
            grid.place(structure);
        }
        grid
    }

    pub fn block(&mut self, location: Location) {
        self.cells.insert(location);
    }

    pub fn unblock(&mut self, location: Location) {
        self.cells.remove(&location);
    }

    /// Block every cell a structure covers
    pub fn place(&mut self, structure: &Structure) {
        self.cells.extend(structure.cells());
    }

    pub fn is_blocked(&self, location: Location) -> bool {
        self.cells.contains(&location)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
