//! Per-tick unit movement
//!
//! Every battle variant exposes the same small surface to AI and combat
//! code through `MovementHandler`: set a goal, clear it, remove a unit, run
//! the planning batch, and step a unit. Grid variants share
//! `WarMovementHandler` and differ only in their `MovementRules`; free-form
//! battles move units straight at their goal.

pub mod free_form;
pub mod ground;
pub mod handler;
pub mod kinematics;
pub mod rules;
pub mod space;

use serde::Serialize;

use crate::battle::location::Location;
use crate::battle::units::WarUnit;
use crate::core::error::Result;
use crate::core::types::UnitId;

pub use free_form::FreeFormMovementHandler;
pub use ground::{GroundMovementRules, GroundWarMovementHandler};
pub use handler::{PlanningGrid, WarMovementHandler};
pub use rules::{ArenaBounds, MovementRules, SimpleMovementRules, WorldView};
pub use space::{
    FullSpaceMovementRules, FullSpaceWarMovementHandler, SpaceMovementRules,
    SpaceWarMovementHandler,
};

/// Handler over the shared rule set (arena edges only)
pub type SimpleWarMovementHandler = WarMovementHandler<SimpleMovementRules>;

/// Where a unit is in its movement cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MovementState {
    /// No goal
    Idle,
    /// Goal set, waiting for a path
    Planning,
    /// Target cell chosen, heading not aligned yet
    Rotating,
    /// Heading aligned, advancing or about to pick the next cell
    Moving,
}

/// What a single `move_unit` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MoveOutcome {
    Destroyed,
    Idle,
    AwaitingPlan,
    /// Replan requested; the unit skips this tick
    Replanning,
    Rotating,
    /// Target reservation contested this tick
    Holding,
    Moving,
    /// Final cell reached; goal cleared
    Arrived,
}

/// Result of one `do_path_plannings` batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanningReport {
    pub submitted: usize,
    pub applied: usize,
    pub retried: usize,
    pub dropped: usize,
    pub discarded: usize,
}

/// Counters for one simulation tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    pub planning: PlanningReport,
    pub moving: usize,
    pub rotating: usize,
    pub arrived: usize,
    pub replanning: usize,
    pub holding: usize,
    pub waiting: usize,
}

impl TickSummary {
    pub fn record(&mut self, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::Moving => self.moving += 1,
            MoveOutcome::Rotating => self.rotating += 1,
            MoveOutcome::Arrived => self.arrived += 1,
            MoveOutcome::Replanning => self.replanning += 1,
            MoveOutcome::Holding => self.holding += 1,
            MoveOutcome::AwaitingPlan => self.waiting += 1,
            MoveOutcome::Idle | MoveOutcome::Destroyed => {}
        }
    }
}

/// Entry points AI and combat code use to move units
pub trait MovementHandler {
    fn add_unit(&mut self, unit: WarUnit) -> Result<()>;

    fn unit(&self, id: UnitId) -> Option<&WarUnit>;

    /// Live units in the order they joined the battle
    fn unit_ids(&self) -> Vec<UnitId>;

    fn set_movement_goal(&mut self, unit: UnitId, destination: Location) -> Result<()>;

    fn move_unit(&mut self, unit: UnitId) -> Result<MoveOutcome>;

    fn remove_unit(&mut self, unit: UnitId) -> Result<WarUnit>;

    fn clear_unit_goal(&mut self, unit: UnitId) -> Result<()>;

    fn do_path_plannings(&mut self) -> PlanningReport;

    /// Planning batch, then one step for every live unit
    fn advance_tick(&mut self) -> Result<TickSummary> {
        let mut summary = TickSummary {
            planning: self.do_path_plannings(),
            ..TickSummary::default()
        };
        for id in self.unit_ids() {
            summary.record(self.move_unit(id)?);
        }
        Ok(summary)
    }
}
