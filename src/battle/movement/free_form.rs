//! Free-form movement: no grid, no planner
//!
//! Units turn towards their goal and fly straight at it. Nothing reserves
//! cells and nothing collides; used where grid avoidance is not needed.

use ahash::AHashMap;

use crate::battle::constants::{CELL_UNITS, POSITION_EPSILON};
use crate::battle::location::Location;
use crate::battle::movement::kinematics::{bearing, rotate_towards, step_towards};
use crate::battle::movement::{MoveOutcome, MovementHandler, PlanningReport};
use crate::battle::units::WarUnit;
use crate::core::config::MovementConfig;
use crate::core::error::{MovementError, Result};
use crate::core::types::UnitId;

pub struct FreeFormMovementHandler {
    config: MovementConfig,
    units: AHashMap<UnitId, WarUnit>,
    roster: Vec<UnitId>,
}

impl FreeFormMovementHandler {
    pub fn new(config: MovementConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            units: AHashMap::new(),
            roster: Vec::new(),
        })
    }

    fn unit_mut(&mut self, id: UnitId) -> Result<&mut WarUnit> {
        self.units.get_mut(&id).ok_or(MovementError::UnknownUnit(id))
    }
}

impl MovementHandler for FreeFormMovementHandler {
    fn add_unit(&mut self, unit: WarUnit) -> Result<()> {
        if self.units.contains_key(&unit.id) {
            return Err(MovementError::DuplicateUnit(unit.id));
        }
        self.roster.push(unit.id);
        self.units.insert(unit.id, unit);
        Ok(())
    }

    fn unit(&self, id: UnitId) -> Option<&WarUnit> {
        self.units.get(&id)
    }

    fn unit_ids(&self) -> Vec<UnitId> {
        self.roster.clone()
    }

    fn set_movement_goal(&mut self, id: UnitId, destination: Location) -> Result<()> {
        let unit = self.unit_mut(id)?;
        if !unit.destroyed {
            unit.goal = Some(destination);
            unit.has_planned_move = true;
        }
        Ok(())
    }

    fn move_unit(&mut self, id: UnitId) -> Result<MoveOutcome> {
        let delay = self.config.simulation_delay;
        let tolerance = self.config.angle_tolerance;
        let unit = self.unit_mut(id)?;
        if unit.destroyed {
            return Ok(MoveOutcome::Destroyed);
        }
        let Some(goal) = unit.goal else {
            return Ok(MoveOutcome::Idle);
        };
        let target = goal.center();

        if let Some(wanted) = bearing(unit.position, target) {
            let (heading, aligned) =
                rotate_towards(unit.heading, wanted, unit.rotation_step(delay), tolerance);
            unit.heading = heading;
            if !aligned {
                unit.next_rotate = Some(goal);
                return Ok(MoveOutcome::Rotating);
            }
        }
        unit.next_rotate = None;

        let distance = unit.speed / CELL_UNITS as f64;
        let (position, _) = step_towards(unit.position, target, distance, POSITION_EPSILON);
        unit.position = position;
        unit.location = Location::new(position.x.round() as i32, position.y.round() as i32);

        if position == target {
            unit.in_motion = false;
            unit.goal = None;
            unit.has_planned_move = false;
            return Ok(MoveOutcome::Arrived);
        }
        unit.in_motion = true;
        Ok(MoveOutcome::Moving)
    }

    fn remove_unit(&mut self, id: UnitId) -> Result<WarUnit> {
        let mut unit = self.units.remove(&id).ok_or(MovementError::UnknownUnit(id))?;
        self.roster.retain(|&other| other != id);
        unit.destroyed = true;
        Ok(unit)
    }

    fn clear_unit_goal(&mut self, id: UnitId) -> Result<()> {
        let unit = self.unit_mut(id)?;
        unit.goal = None;
        unit.has_planned_move = false;
        unit.next_rotate = None;
        unit.in_motion = false;
        Ok(())
    }

    fn do_path_plannings(&mut self) -> PlanningReport {
        PlanningReport::default()
    }
}
