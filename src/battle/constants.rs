//! Movement engine constants - all tunable values in one place
//!
//! Distances are integer-scaled: one grid cell is `CELL_UNITS` long, so
//! path costs stay in integer arithmetic.

// Grid scale
pub const CELL_UNITS: i64 = 1000;
pub const ORTHOGONAL_COST: i64 = 1000;
pub const DIAGONAL_COST: i64 = 1414; // sqrt(2) * 1000

// Location neighbour cache covers this range on both axes
pub const LOCATION_CACHE_MIN: i32 = -16;
pub const LOCATION_CACHE_MAX: i32 = 128;

// Planning scheduler
pub const DEFAULT_PLANNING_BATCH_SIZE: usize = 10;
pub const DEFAULT_PLANNING_RETRIES: u32 = 20;
pub const DEFAULT_MAX_EXPANDED_NODES: usize = 20_000;

// Movement state machine
pub const DEFAULT_REPLAN_CHANCE: f64 = 0.1;
pub const DEFAULT_SIMULATION_DELAY: f64 = 1.0;
pub const DEFAULT_ANGLE_TOLERANCE: f64 = 0.01;

// Congestion
pub const DEFAULT_CONGESTION_FACTOR: f64 = 0.05;
pub const DEFAULT_WEIGHT_MAP_MARGIN: i32 = 32;

// Arena
pub const DEFAULT_ARENA_WIDTH: i32 = 60;
pub const DEFAULT_ARENA_HEIGHT: i32 = 40;
pub const DEFAULT_RETREAT_MARGIN: i32 = 8;

// Float slack for snapping onto cell centres
pub const POSITION_EPSILON: f64 = 1e-9;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagonal_cost_approximates_sqrt2() {
        let exact = (2.0f64).sqrt() * ORTHOGONAL_COST as f64;
        assert!((DIAGONAL_COST as f64 - exact).abs() < 1.0);
    }

    #[test]
    fn test_cache_range_ordered() {
        assert!(LOCATION_CACHE_MIN < 0);
        assert!(LOCATION_CACHE_MAX > DEFAULT_ARENA_WIDTH);
    }

    #[test]
    fn test_retreat_margin_fits_weight_map() {
        assert!(DEFAULT_RETREAT_MARGIN <= DEFAULT_WEIGHT_MAP_MARGIN);
    }
}
