//! Congestion weights shared by planner workers and the tick thread
//!
//! Each cell counts how many committed unit paths still cross it. Planner
//! workers read the counters to price edges; the tick thread credits new
//! paths and debits consumed or discarded cells. Every access goes through
//! the map's mutex.

use parking_lot::Mutex;

use crate::battle::location::Location;

#[derive(Debug)]
struct WeightGrid {
    weights: Vec<u16>,
    width: i32,
    height: i32,
    offset: i32,
}

impl WeightGrid {
    fn index(&self, location: Location) -> Option<usize> {
        let x = location.x + self.offset;
        let y = location.y + self.offset;
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    fn increment(&mut self, location: Location) {
        if let Some(idx) = self.index(location) {
            self.weights[idx] = self.weights[idx].saturating_add(1);
        }
    }

    fn decrement(&mut self, location: Location) {
        if let Some(idx) = self.index(location) {
            if self.weights[idx] == 0 {
                tracing::warn!("Weight map underflow at {}", location);
                return;
            }
            self.weights[idx] -= 1;
        }
    }
}

/// Lock-protected congestion grid
#[derive(Debug)]
pub struct PathWeightMap {
    grid: Mutex<WeightGrid>,
}

impl PathWeightMap {
    /// Grid covering `[-margin, width + margin) x [-margin, height + margin)`
    pub fn new(width: i32, height: i32, margin: i32) -> Self {
        let w = (width + 2 * margin).max(0);
        let h = (height + 2 * margin).max(0);
        Self {
            grid: Mutex::new(WeightGrid {
                weights: vec![0; (w * h) as usize],
                width: w,
                height: h,
                offset: margin,
            }),
        }
    }

    /// Current counter of a cell; 0 outside the grid
    pub fn weight(&self, location: Location) -> u16 {
        let grid = self.grid.lock();
        grid.index(location).map_or(0, |idx| grid.weights[idx])
    }

    /// `base` scaled by `1 + weight * factor`
    pub fn weighted_cost(&self, base: i64, location: Location, factor: f64) -> i64 {
        let weight = self.weight(location);
        if weight == 0 {
            return base;
        }
        base + (base as f64 * weight as f64 * factor).round() as i64
    }

    pub fn add_path<'a>(&self, cells: impl IntoIterator<Item = &'a Location>) {
        let mut grid = self.grid.lock();
        for &cell in cells {
            grid.increment(cell);
        }
    }

    pub fn remove_path<'a>(&self, cells: impl IntoIterator<Item = &'a Location>) {
        let mut grid = self.grid.lock();
        for &cell in cells {
            grid.decrement(cell);
        }
    }

    /// Debit a single cell a unit has passed through
    pub fn consume(&self, location: Location) {
        self.grid.lock().decrement(location);
    }

    /// Debit `old` and credit `new` under one lock acquisition
    pub fn replace_path<'a, 'b>(
        &self,
        old: impl IntoIterator<Item = &'a Location>,
        new: impl IntoIterator<Item = &'b Location>,
    ) {
        let mut grid = self.grid.lock();
        for &cell in old {
            grid.decrement(cell);
        }
        for &cell in new {
            grid.increment(cell);
        }
    }

    /// Sum of all counters
    pub fn total(&self) -> u64 {
        self.grid.lock().weights.iter().map(|&w| w as u64).sum()
    }

    pub fn clear(&self) {
        self.grid.lock().weights.fill(0);
    }
}
