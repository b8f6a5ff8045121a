//! Battle movement - pathfinding and per-tick unit motion on a square grid
//!
//! Movement is greedy and per-unit: every unit plans its own route, and
//! cell reservations keep two units from entering the same cell at once.
//!
//! Key pieces:
//! - Generic A* with approximate fallback, specialised for grid cells
//! - Congestion weights that bias routes away from busy cells
//! - Batched planning on a worker pool, joined once per tick
//! - Rotate-then-translate kinematics with reservations

pub mod astar;
pub mod constants;
pub mod location;
pub mod movement;
pub mod pathfinding;
pub mod placement;
pub mod planner;
pub mod units;
pub mod weight_map;

// Re-exports for convenient access
pub use astar::{AStarSearch, SearchResult, SearchSpace};
pub use constants::*;
pub use location::Location;
pub use movement::{
    FreeFormMovementHandler, FullSpaceWarMovementHandler, GroundWarMovementHandler, MoveOutcome,
    MovementHandler, MovementRules, MovementState, PlanningReport, SimpleWarMovementHandler,
    SpaceWarMovementHandler, TickSummary, WarMovementHandler,
};
pub use pathfinding::{GridRules, Pathfinding};
pub use placement::{PlacementGrid, Structure};
pub use planner::{PathPlanner, PathPlanning};
pub use units::{PathingMethod, UnitClass, WarUnit};
pub use weight_map::PathWeightMap;
