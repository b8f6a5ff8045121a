//! A* pathfinding for square battle grids
//!
//! Wraps the generic search with grid rules: hard blocking (terrain, arena
//! edges), soft passability (other units), Manhattan heuristic, and
//! corner-cut avoidance on diagonal steps.

use crate::battle::astar::{AStarSearch, SearchResult, SearchSpace};
use crate::battle::constants::{CELL_UNITS, DIAGONAL_COST, ORTHOGONAL_COST};
use crate::battle::location::Location;

/// Cell rules a grid search consults
///
/// `is_blocked` is static terrain; `is_passable` is situational (units in
/// the way). Cost callbacks default to the integer-scaled grid metric.
pub trait GridRules {
    fn is_passable(&self, location: Location) -> bool;

    fn is_blocked(&self, location: Location) -> bool;

    fn heuristic(&self, from: Location, to: Location) -> i64 {
        from.manhattan(&to) as i64 * CELL_UNITS
    }

    fn edge_cost(&self, from: Location, to: Location) -> i64 {
        step_cost(from, to)
    }

    fn true_distance(&self, from: Location, to: Location) -> i64 {
        (from.euclidean(&to) * CELL_UNITS as f64).round() as i64
    }
}

/// Unweighted cost of a single orthogonal or diagonal step
pub fn step_cost(from: Location, to: Location) -> i64 {
    if from.is_diagonal_to(&to) {
        DIAGONAL_COST
    } else {
        ORTHOGONAL_COST
    }
}

/// Grid rules built from two closures
pub struct FnRules<P, B> {
    passable: P,
    blocked: B,
}

impl<P, B> GridRules for FnRules<P, B>
where
    P: Fn(Location) -> bool,
    B: Fn(Location) -> bool,
{
    fn is_passable(&self, location: Location) -> bool {
        (self.passable)(location)
    }

    fn is_blocked(&self, location: Location) -> bool {
        (self.blocked)(location)
    }
}

/// Grid search configured with a set of rules
pub struct Pathfinding<R> {
    rules: R,
    max_expanded: Option<usize>,
}

impl<P, B> Pathfinding<FnRules<P, B>>
where
    P: Fn(Location) -> bool,
    B: Fn(Location) -> bool,
{
    pub fn from_fns(passable: P, blocked: B) -> Self {
        Self::new(FnRules { passable, blocked })
    }
}

impl<R: GridRules> Pathfinding<R> {
    pub fn new(rules: R) -> Self {
        Self {
            rules,
            max_expanded: None,
        }
    }

    pub fn with_expansion_limit(mut self, limit: Option<usize>) -> Self {
        self.max_expanded = limit;
        self
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn is_passable(&self, location: Location) -> bool {
        self.rules.is_passable(location)
    }

    pub fn is_blocked(&self, location: Location) -> bool {
        self.rules.is_blocked(location)
    }

    /// Search from `from` to `to`, falling back to the nearest reachable cell
    pub fn search_approximate(&self, from: Location, to: Location) -> SearchResult<Location> {
        AStarSearch::new(self)
            .with_expansion_limit(self.max_expanded)
            .search(from, to)
    }

    /// Passable cells on the border of the square of `radius` around `center`
    pub fn square_around(&self, center: Location, radius: u32) -> Vec<Location> {
        let r = radius as i32;
        if r == 0 {
            return [center]
                .into_iter()
                .filter(|&loc| self.can_enter(loc))
                .collect();
        }

        let mut cells = Vec::with_capacity(8 * radius as usize);
        // Top and bottom rows, then the side columns without corners
        for dx in -r..=r {
            cells.push(center.delta(dx, -r));
            cells.push(center.delta(dx, r));
        }
        for dy in (-r + 1)..r {
            cells.push(center.delta(-r, dy));
            cells.push(center.delta(r, dy));
        }

        cells.retain(|&loc| self.can_enter(loc));
        cells
    }

    fn can_enter(&self, location: Location) -> bool {
        !self.rules.is_blocked(location) && self.rules.is_passable(location)
    }
}

impl<R: GridRules> SearchSpace for Pathfinding<R> {
    type Node = Location;

    fn heuristic(&self, from: &Location, to: &Location) -> i64 {
        self.rules.heuristic(*from, *to)
    }

    fn distance(&self, from: &Location, to: &Location) -> i64 {
        self.rules.edge_cost(*from, *to)
    }

    fn neighbors(&self, node: &Location) -> Vec<Location> {
        node.neighbors()
            .into_iter()
            .filter(|&next| self.can_enter(next))
            .filter(|&next| {
                // No corner cutting: both flanking orthogonals must be open terrain
                !node.is_diagonal_to(&next)
                    || (!self.rules.is_blocked(Location::of(next.x, node.y))
                        && !self.rules.is_blocked(Location::of(node.x, next.y)))
            })
            .collect()
    }

    fn true_distance(&self, from: &Location, to: &Location) -> i64 {
        self.rules.true_distance(*from, *to)
    }
}
