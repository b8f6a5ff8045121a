//! Grid movement state machine
//!
//! Each tick a unit goes through at most one of: pick the next cell off its
//! path, turn towards it, or advance towards it. A unit only translates
//! once its heading is aligned, holds an exclusive reservation on the cell
//! it is entering, and hands congestion weight back as it consumes cells.
//!
//! The roster, reservation table and occupancy index are written only by
//! the thread calling into the handler. Planner workers read them while
//! that thread is parked inside `do_path_plannings`.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::battle::constants::{CELL_UNITS, POSITION_EPSILON};
use crate::battle::location::Location;
use crate::battle::movement::kinematics::{angle_between, bearing, rotate_towards, step_towards};
use crate::battle::movement::rules::{MovementRules, WorldView};
use crate::battle::movement::{MoveOutcome, MovementHandler, MovementState, PlanningReport};
use crate::battle::pathfinding::{step_cost, GridRules, Pathfinding};
use crate::battle::planner::{PathPlanner, PathPlanning};
use crate::battle::units::{PathingMethod, WarUnit};
use crate::battle::weight_map::PathWeightMap;
use crate::core::config::MovementConfig;
use crate::core::error::{MovementError, Result};
use crate::core::types::UnitId;

/// Grid rules for one unit's search: arena policy plus congestion pricing
pub struct PlanningGrid<'a, R> {
    rules: &'a R,
    view: WorldView<'a>,
    unit: &'a WarUnit,
    weights: Option<&'a PathWeightMap>,
    congestion_factor: f64,
}

impl<'a, R: MovementRules> PlanningGrid<'a, R> {
    pub fn new(
        rules: &'a R,
        view: WorldView<'a>,
        unit: &'a WarUnit,
        weights: &'a PathWeightMap,
        congestion_factor: f64,
    ) -> Self {
        Self {
            rules,
            view,
            unit,
            weights: (unit.pathing == PathingMethod::Weighted).then_some(weights),
            congestion_factor,
        }
    }
}

impl<R: MovementRules> GridRules for PlanningGrid<'_, R> {
    fn is_passable(&self, location: Location) -> bool {
        self.rules.is_passable(&self.view, self.unit, location)
    }

    fn is_blocked(&self, location: Location) -> bool {
        self.rules.is_blocked(self.unit, location)
    }

    fn edge_cost(&self, from: Location, to: Location) -> i64 {
        let base = step_cost(from, to);
        match self.weights {
            Some(weights) => weights.weighted_cost(base, to, self.congestion_factor),
            None => base,
        }
    }
}

enum PlanOutcome {
    Applied,
    Retried,
    Dropped,
    Discarded,
}

/// Movement engine for grid battles
pub struct WarMovementHandler<R: MovementRules> {
    rules: R,
    config: MovementConfig,
    units: AHashMap<UnitId, WarUnit>,
    roster: Vec<UnitId>,
    reserved: AHashMap<Location, UnitId>,
    occupancy: AHashMap<Location, AHashSet<UnitId>>,
    planner: PathPlanner,
    weights: PathWeightMap,
    rng: ChaCha8Rng,
}

impl<R: MovementRules> WarMovementHandler<R> {
    pub fn new(rules: R, config: MovementConfig) -> Result<Self> {
        config.validate()?;

        let arena = rules.arena();
        let weights = PathWeightMap::new(arena.width, arena.height, config.weight_map_margin);
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let planner = PathPlanner::new(&config)?;

        Ok(Self {
            rules,
            config,
            units: AHashMap::new(),
            roster: Vec::new(),
            reserved: AHashMap::new(),
            occupancy: AHashMap::new(),
            planner,
            weights,
            rng,
        })
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn weight_map(&self) -> &PathWeightMap {
        &self.weights
    }

    pub fn reserved_by(&self, location: Location) -> Option<UnitId> {
        self.reserved.get(&location).copied()
    }

    /// Units indexed at `location`
    pub fn occupants(&self, location: Location) -> Vec<UnitId> {
        self.view().occupants(location).map(|u| u.id).collect()
    }

    pub fn is_planning(&self, id: UnitId) -> bool {
        self.planner.is_pending(id)
    }

    pub fn state_of(&self, id: UnitId) -> Option<MovementState> {
        let unit = self.units.get(&id)?;
        let state = if unit.destroyed {
            MovementState::Idle
        } else if unit.is_rotating() {
            MovementState::Rotating
        } else if unit.in_motion || unit.next_move.is_some() {
            MovementState::Moving
        } else if unit.goal.is_none() {
            MovementState::Idle
        } else if self.planner.is_pending(id) || unit.path.is_empty() {
            MovementState::Planning
        } else {
            MovementState::Moving
        };
        Some(state)
    }

    /// Pathfinding as `id` would see the grid right now
    ///
    /// Useful for deployment queries such as `square_around`.
    pub fn pathfinding_for(&self, id: UnitId) -> Option<Pathfinding<PlanningGrid<'_, R>>> {
        let unit = self.units.get(&id)?;
        let grid = PlanningGrid::new(
            &self.rules,
            self.view(),
            unit,
            &self.weights,
            self.config.congestion_factor,
        );
        Some(Pathfinding::new(grid).with_expansion_limit(self.config.max_expanded_nodes))
    }

    pub fn set_attack_move(&mut self, id: UnitId, target: Option<UnitId>) -> Result<()> {
        self.unit_mut(id)?.attack_move_target = target;
        Ok(())
    }

    pub fn set_ram_target(&mut self, id: UnitId, target: Option<UnitId>) -> Result<()> {
        self.unit_mut(id)?.ram_target = target;
        Ok(())
    }

    pub fn set_fleeing(&mut self, id: UnitId, fleeing: bool) -> Result<()> {
        self.unit_mut(id)?.fleeing = fleeing;
        Ok(())
    }

    /// Keep a destroyed unit on the grid as a passable wreck
    pub fn mark_destroyed(&mut self, id: UnitId) -> Result<()> {
        self.clear_unit_goal(id)?;
        let unit = self.unit_mut(id)?;
        unit.destroyed = true;
        unit.in_motion = false;
        let target = unit.next_move.take();
        let charged = std::mem::take(&mut unit.next_move_charged);
        unit.next_rotate = None;
        if let Some(target) = target {
            if charged {
                self.weights.consume(target);
            }
            release_reservation(&mut self.reserved, id, target);
        }
        Ok(())
    }

    fn view(&self) -> WorldView<'_> {
        WorldView {
            units: &self.units,
            reserved: &self.reserved,
            occupancy: &self.occupancy,
        }
    }

    fn unit_ref(&self, id: UnitId) -> Result<&WarUnit> {
        self.units.get(&id).ok_or(MovementError::UnknownUnit(id))
    }

    fn unit_mut(&mut self, id: UnitId) -> Result<&mut WarUnit> {
        self.units.get_mut(&id).ok_or(MovementError::UnknownUnit(id))
    }

    fn apply_planning(&mut self, planning: PathPlanning) -> PlanOutcome {
        let id = planning.unit;
        let Some(unit) = self.units.get_mut(&id) else {
            return PlanOutcome::Discarded;
        };
        if unit.destroyed || unit.goal != Some(planning.goal) || self.planner.is_pending(id) {
            return PlanOutcome::Discarded;
        }

        if !planning.found {
            let goal = planning.goal;
            if self.planner.retry(planning) {
                return PlanOutcome::Retried;
            }
            tracing::debug!("Unit {:?} found no path to {}; giving up", id, goal);
            unit.goal = None;
            unit.has_planned_move = false;
            return PlanOutcome::Dropped;
        }

        let mut path: VecDeque<Location> = planning.path.into_iter().collect();
        if path.front() == Some(&planning.current) {
            path.pop_front();
        }

        // A target picked from the old path is only kept once the unit is under way
        if !unit.in_motion {
            if let Some(target) = unit.next_move.take() {
                if std::mem::take(&mut unit.next_move_charged) {
                    self.weights.consume(target);
                }
                release_reservation(&mut self.reserved, id, target);
            }
            unit.next_rotate = None;
        }

        self.weights.replace_path(unit.path.iter(), path.iter());
        unit.path = path;
        unit.has_planned_move = true;
        PlanOutcome::Applied
    }

    /// Queue a fresh plan for the unit's goal and drop its pending target
    fn request_replan(&mut self, id: UnitId) {
        let Some(unit) = self.units.get_mut(&id) else {
            return;
        };

        if !unit.in_motion {
            if let Some(target) = unit.next_move.take() {
                if std::mem::take(&mut unit.next_move_charged) {
                    self.weights.consume(target);
                }
                release_reservation(&mut self.reserved, id, target);
            }
            unit.next_rotate = None;
        }
        self.weights.remove_path(unit.path.iter());
        unit.path.clear();
        unit.has_planned_move = false;

        if let Some(goal) = unit.goal {
            tracing::trace!("Unit {:?} replanning towards {}", id, goal);
            self.planner.request(id, goal);
        }
    }

    /// Pop the next path cell as move and rotation target
    ///
    /// Returns `None` when the unit has nothing to do this tick.
    fn select_target(&mut self, id: UnitId) -> Result<Option<MoveOutcome>> {
        let tolerance = self.config.angle_tolerance;
        let pending = self.planner.is_pending(id);
        let unit = self.unit_mut(id)?;

        if unit.path.is_empty() {
            let (has_goal, planned) = (unit.goal.is_some(), unit.has_planned_move);
            let outcome = if !has_goal {
                MoveOutcome::Idle
            } else if pending {
                MoveOutcome::AwaitingPlan
            } else if planned {
                // Committed path ran out, possibly short of the goal
                unit.goal = None;
                unit.has_planned_move = false;
                MoveOutcome::Arrived
            } else {
                self.request_replan(id);
                MoveOutcome::Replanning
            };
            return Ok(Some(outcome));
        }

        if self.config.replan_chance > 0.0 && self.rng.gen_bool(self.config.replan_chance) {
            self.request_replan(id);
            return Ok(Some(MoveOutcome::Replanning));
        }

        let unit = self.unit_mut(id)?;
        let Some(target) = unit.path.pop_front() else {
            return Ok(Some(MoveOutcome::Idle));
        };
        unit.next_move = Some(target);
        unit.next_move_charged = true;
        unit.next_rotate = needs_rotation(unit, target, tolerance).then_some(target);

        if !self.can_enter(id, target)? {
            self.request_replan(id);
            return Ok(Some(MoveOutcome::Replanning));
        }
        Ok(None)
    }

    /// Target is free of terrain, blocking units and foreign reservations
    fn can_enter(&self, id: UnitId, target: Location) -> Result<bool> {
        let unit = self.unit_ref(id)?;
        let view = self.view();
        let reserved_elsewhere = matches!(view.reserved_by(target), Some(holder) if holder != id);
        Ok(!reserved_elsewhere
            && !self.rules.is_blocked(unit, target)
            && self.rules.is_passable(&view, unit, target))
    }

    fn rotate(&mut self, id: UnitId, target: Location) -> Result<MoveOutcome> {
        let delay = self.config.simulation_delay;
        let tolerance = self.config.angle_tolerance;
        let unit = self.unit_mut(id)?;

        match bearing(unit.position, target.center()) {
            None => unit.next_rotate = None,
            Some(wanted) => {
                let step = unit.rotation_step(delay);
                let (heading, aligned) = rotate_towards(unit.heading, wanted, step, tolerance);
                unit.heading = heading;
                if aligned {
                    unit.next_rotate = None;
                }
            }
        }
        Ok(MoveOutcome::Rotating)
    }

    fn try_reserve(&mut self, id: UnitId, target: Location) -> Result<bool> {
        match self.reserved.get(&target).copied() {
            Some(holder) => Ok(holder == id),
            None => {
                let clear = {
                    let unit = self.unit_ref(id)?;
                    self.rules.has_clearance(&self.view(), unit, target)
                };
                if clear {
                    self.reserved.insert(target, id);
                }
                Ok(clear)
            }
        }
    }

    /// Advance along the straight line to the target, sub-stepping into
    /// following cells while budget is left and no turn is needed
    fn straight_step(&mut self, id: UnitId) -> Result<MoveOutcome> {
        let tolerance = self.config.angle_tolerance;
        let mut budget = 1.0;

        loop {
            let Some(target) = self.unit_ref(id)?.next_move else {
                return Ok(MoveOutcome::Idle);
            };

            if !self.try_reserve(id, target)? {
                if matches!(self.reserved_by(target), Some(holder) if holder != id) {
                    return Ok(MoveOutcome::Holding);
                }
                // Exclusion zone filled up since the target was picked
                self.request_replan(id);
                return Ok(MoveOutcome::Replanning);
            }

            let unit = self.unit_mut(id)?;
            unit.in_motion = true;
            let distance = unit.speed / CELL_UNITS as f64 * budget;
            let goal = target.center();
            let (position, leftover) = step_towards(unit.position, goal, distance, POSITION_EPSILON);
            unit.position = position;
            if position != goal {
                return Ok(MoveOutcome::Moving);
            }

            let leftover_budget = if distance > 0.0 {
                budget * leftover / distance
            } else {
                0.0
            };
            self.enter_cell(id, target)?;

            let pending = self.planner.is_pending(id);
            let unit = self.unit_mut(id)?;
            let Some(&next) = unit.path.front() else {
                if pending {
                    // Goal changed under way; the new plan takes over from here
                    return Ok(MoveOutcome::Moving);
                }
                unit.goal = None;
                unit.has_planned_move = false;
                tracing::trace!("Unit {:?} arrived at {}", id, target);
                return Ok(MoveOutcome::Arrived);
            };

            if leftover_budget <= POSITION_EPSILON
                || needs_rotation(unit, next, tolerance)
                || !self.can_enter(id, next)?
                || self.rules.has_stationary_occupant(&self.view(), self.unit_ref(id)?, next)
            {
                return Ok(MoveOutcome::Moving);
            }

            let unit = self.unit_mut(id)?;
            unit.path.pop_front();
            unit.next_move = Some(next);
            unit.next_move_charged = true;
            budget = leftover_budget;
        }
    }

    /// Snap onto `target`, release its reservation and move the unit's index entry
    fn enter_cell(&mut self, id: UnitId, target: Location) -> Result<()> {
        release_reservation(&mut self.reserved, id, target);

        let (old_cells, new_cells) = {
            let unit = self.unit_ref(id)?;
            (
                self.rules.footprint(unit, unit.location),
                self.rules.footprint(unit, target),
            )
        };

        let unit = self.unit_mut(id)?;
        unit.location = target;
        unit.position = target.center();
        unit.next_move = None;
        unit.in_motion = false;
        if std::mem::take(&mut unit.next_move_charged) {
            self.weights.consume(target);
        }

        let unindexed = self.unindex(id, &old_cells);
        self.index(id, &new_cells);
        unindexed
    }

    fn index(&mut self, id: UnitId, cells: &[Location]) {
        for &cell in cells {
            self.occupancy.entry(cell).or_default().insert(id);
        }
    }

    /// Drop `id` from `cells`; a missing entry is an index inconsistency
    fn unindex(&mut self, id: UnitId, cells: &[Location]) -> Result<()> {
        let mut violation = None;
        for &cell in cells {
            let removed = match self.occupancy.get_mut(&cell) {
                Some(set) => {
                    let removed = set.remove(&id);
                    if set.is_empty() {
                        self.occupancy.remove(&cell);
                    }
                    removed
                }
                None => false,
            };
            if !removed {
                tracing::warn!("Spatial index inconsistency: unit {:?} not indexed at {}", id, cell);
                violation.get_or_insert(cell);
            }
        }

        match violation {
            Some(location) if self.config.strict_spatial_index => {
                Err(MovementError::IndexInconsistency { unit: id, location })
            }
            _ => Ok(()),
        }
    }
}

fn release_reservation(reserved: &mut AHashMap<Location, UnitId>, id: UnitId, location: Location) {
    if reserved.get(&location) == Some(&id) {
        reserved.remove(&location);
    }
}

fn needs_rotation(unit: &WarUnit, target: Location, tolerance: f64) -> bool {
    bearing(unit.position, target.center())
        .is_some_and(|wanted| angle_between(unit.heading, wanted).abs() > tolerance)
}

impl<R: MovementRules> MovementHandler for WarMovementHandler<R> {
    fn add_unit(&mut self, unit: WarUnit) -> Result<()> {
        if self.units.contains_key(&unit.id) {
            return Err(MovementError::DuplicateUnit(unit.id));
        }
        let id = unit.id;
        let cells = self.rules.footprint(&unit, unit.location);
        self.units.insert(id, unit);
        self.index(id, &cells);
        self.roster.push(id);
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
        if unit.destroyed || unit.goal == Some(destination) {
            return Ok(());
        }
        unit.goal = Some(destination);
        self.planner.request(id, destination);
        Ok(())
    }

    fn move_unit(&mut self, id: UnitId) -> Result<MoveOutcome> {
        let unit = self.unit_ref(id)?;
        if unit.destroyed {
            return Ok(MoveOutcome::Destroyed);
        }

        if unit.next_move.is_none() {
            if let Some(outcome) = self.select_target(id)? {
                return Ok(outcome);
            }
        }

        let unit = self.unit_ref(id)?;
        let Some(target) = unit.next_move else {
            return Ok(MoveOutcome::Idle);
        };

        if !unit.in_motion && self.rules.has_stationary_occupant(&self.view(), unit, target) {
            self.request_replan(id);
            return Ok(MoveOutcome::Replanning);
        }

        if unit.is_rotating() {
            return self.rotate(id, target);
        }

        self.straight_step(id)
    }

    fn remove_unit(&mut self, id: UnitId) -> Result<WarUnit> {
        let mut unit = self.units.remove(&id).ok_or(MovementError::UnknownUnit(id))?;
        self.roster.retain(|&other| other != id);
        self.planner.cancel(id);

        self.weights.remove_path(unit.path.iter());
        if let Some(target) = unit.next_move {
            if unit.next_move_charged {
                self.weights.consume(target);
            }
        }
        unit.next_move_charged = false;
        self.reserved.retain(|_, holder| *holder != id);

        let cells = self.rules.footprint(&unit, unit.location);
        unit.destroyed = true;
        self.unindex(id, &cells)?;
        Ok(unit)
    }

    fn clear_unit_goal(&mut self, id: UnitId) -> Result<()> {
        self.planner.cancel(id);
        let unit = self.units.get_mut(&id).ok_or(MovementError::UnknownUnit(id))?;
        unit.goal = None;
        unit.has_planned_move = false;
        self.weights.remove_path(unit.path.iter());
        unit.path.clear();

        if !unit.in_motion {
            if let Some(target) = unit.next_move.take() {
                if std::mem::take(&mut unit.next_move_charged) {
                    self.weights.consume(target);
                }
                release_reservation(&mut self.reserved, id, target);
            }
            unit.next_rotate = None;
        }
        Ok(())
    }

    fn do_path_plannings(&mut self) -> PlanningReport {
        let batch = self.planner.take_batch();
        let mut report = PlanningReport {
            submitted: batch.len(),
            ..PlanningReport::default()
        };
        if batch.is_empty() {
            return report;
        }

        let results = {
            let view = self.view();
            let rules = &self.rules;
            let weights: &PathWeightMap = &self.weights;
            let factor = self.config.congestion_factor;
            let limit = self.config.max_expanded_nodes;

            self.planner.run_batch(batch, |planning| {
                let Some(unit) = view.unit(planning.unit) else {
                    return;
                };
                let grid = PlanningGrid::new(rules, view, unit, weights, factor);
                let pathfinding = Pathfinding::new(grid).with_expansion_limit(limit);
                planning.execute(unit, &pathfinding);
            })
        };

        for planning in results {
            match self.apply_planning(planning) {
                PlanOutcome::Applied => report.applied += 1,
                PlanOutcome::Retried => report.retried += 1,
                PlanOutcome::Dropped => report.dropped += 1,
                PlanOutcome::Discarded => report.discarded += 1,
            }
        }

        tracing::debug!(
            "Path planning batch: {} submitted, {} applied, {} retried, {} dropped",
            report.submitted,
            report.applied,
            report.retried,
            report.dropped
        );
        report
    }
}
