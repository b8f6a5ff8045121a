//! Square grid coordinates for battle arenas
//!
//! `Location` is a plain `(x, y)` value: equality and hashing are by
//! coordinate. Neighbour lists for the common coordinate range are built
//! once into a shared table; coordinates outside that range (fleeing units,
//! far retreat corridors) compute theirs on demand.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::battle::constants::{LOCATION_CACHE_MAX, LOCATION_CACHE_MIN};

/// Orthogonal offsets first, then diagonals
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

const CACHE_SPAN: i32 = LOCATION_CACHE_MAX - LOCATION_CACHE_MIN;

static NEIGHBOR_TABLE: OnceLock<Vec<[Location; 8]>> = OnceLock::new();

/// Grid cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Canonical constructor; identical to `new`, kept for call sites that
    /// read as lookups (`Location::of(x, y)`)
    pub const fn of(x: i32, y: i32) -> Self {
        Self::new(x, y)
    }

    pub fn delta(&self, dx: i32, dy: i32) -> Self {
        Self::of(self.x + dx, self.y + dy)
    }

    /// True when this coordinate has a precomputed neighbour entry
    pub fn is_cached(&self) -> bool {
        (LOCATION_CACHE_MIN..LOCATION_CACHE_MAX).contains(&self.x)
            && (LOCATION_CACHE_MIN..LOCATION_CACHE_MAX).contains(&self.y)
    }

    /// The 8 surrounding cells: 4 orthogonal, then 4 diagonal
    pub fn neighbors(&self) -> [Location; 8] {
        if !self.is_cached() {
            return self.compute_neighbors();
        }
        let table = NEIGHBOR_TABLE.get_or_init(build_neighbor_table);
        let idx = ((self.y - LOCATION_CACHE_MIN) * CACHE_SPAN + (self.x - LOCATION_CACHE_MIN)) as usize;
        table[idx]
    }

    fn compute_neighbors(&self) -> [Location; 8] {
        NEIGHBOR_OFFSETS.map(|(dx, dy)| self.delta(dx, dy))
    }

    pub fn manhattan(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn chebyshev(&self, other: &Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    pub fn euclidean(&self, other: &Self) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when `other` is a diagonal neighbour of this cell
    pub fn is_diagonal_to(&self, other: &Self) -> bool {
        self.x.abs_diff(other.x) == 1 && self.y.abs_diff(other.y) == 1
    }

    /// Cell centre in continuous cell units
    pub fn center(&self) -> glam::DVec2 {
        glam::DVec2::new(self.x as f64, self.y as f64)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Location {
    fn from((x, y): (i32, i32)) -> Self {
        Self::of(x, y)
    }
}

fn build_neighbor_table() -> Vec<[Location; 8]> {
    let mut table = Vec::with_capacity((CACHE_SPAN * CACHE_SPAN) as usize);
    for y in LOCATION_CACHE_MIN..LOCATION_CACHE_MAX {
        for x in LOCATION_CACHE_MIN..LOCATION_CACHE_MAX {
            table.push(Location::new(x, y).compute_neighbors());
        }
    }
    table
}
