//! Units moved by the battle movement engine
//!
//! A `WarUnit` carries everything the movement state machine reads and
//! writes each tick: grid cell, exact position, kinematic limits, the
//! committed path and the in-flight targets.

use std::collections::VecDeque;
use std::f64::consts::TAU;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::battle::location::Location;
use crate::core::types::{PlayerId, RetreatSide, UnitId};

/// Hull / chassis class; decides footprint and exclusion behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitClass {
    Fighter,
    Cruiser,
    Battleship,
    CapitalShip,
    Station,
    GroundVehicle,
}

/// Default kinematics for a unit class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitProperties {
    /// Distance units per tick (one cell = 1000)
    pub speed: f64,
    pub rotation_time: f64,
    pub angle_count: u32,
}

impl UnitClass {
    pub fn default_properties(&self) -> UnitProperties {
        match self {
            UnitClass::Fighter => UnitProperties {
                speed: 500.0,
                rotation_time: 1.0,
                angle_count: 4,
            },
            UnitClass::Cruiser => UnitProperties {
                speed: 250.0,
                rotation_time: 1.0,
                angle_count: 8,
            },
            UnitClass::Battleship => UnitProperties {
                speed: 200.0,
                rotation_time: 1.0,
                angle_count: 12,
            },
            UnitClass::CapitalShip => UnitProperties {
                speed: 150.0,
                rotation_time: 1.0,
                angle_count: 16,
            },
            UnitClass::Station => UnitProperties {
                speed: 0.0,
                rotation_time: 0.0,
                angle_count: 0,
            },
            UnitClass::GroundVehicle => UnitProperties {
                speed: 250.0,
                rotation_time: 1.0,
                angle_count: 8,
            },
        }
    }

    pub fn is_fighter(&self) -> bool {
        matches!(self, UnitClass::Fighter)
    }

    pub fn is_station(&self) -> bool {
        matches!(self, UnitClass::Station)
    }

    /// Ships that keep an exclusion zone in full-space battles
    pub fn needs_clearance(&self) -> bool {
        matches!(
            self,
            UnitClass::Cruiser | UnitClass::Battleship | UnitClass::CapitalShip
        )
    }
}

/// How a unit prices its path searches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PathingMethod {
    /// Edge costs rise with the congestion weight of the entered cell
    #[default]
    Weighted,
    /// Plain grid metric
    Direct,
}

/// A unit on the battle grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarUnit {
    pub id: UnitId,
    pub owner: PlayerId,
    pub class: UnitClass,

    // Position
    pub location: Location,
    pub position: DVec2,
    pub heading: f64, // radians, 0 = +x

    // Kinematics
    pub speed: f64,
    pub rotation_time: f64,
    pub angle_count: u32,

    // Movement state
    pub goal: Option<Location>,
    pub path: VecDeque<Location>,
    pub next_move: Option<Location>,
    pub next_rotate: Option<Location>,
    pub in_motion: bool,
    pub has_planned_move: bool,
    pub pathing: PathingMethod,

    // Orders that change what counts as an obstacle
    pub attack_move_target: Option<UnitId>,
    pub ram_target: Option<UnitId>,
    pub fleeing: bool,
    pub retreat_side: RetreatSide,

    pub destroyed: bool,

    /// `next_move` came off the path and is still charged to the weight map
    pub(crate) next_move_charged: bool,
}

impl WarUnit {
    pub fn new(id: UnitId, owner: PlayerId, class: UnitClass, location: Location) -> Self {
        let props = class.default_properties();
        Self {
            id,
            owner,
            class,
            location,
            position: location.center(),
            heading: 0.0,
            speed: props.speed,
            rotation_time: props.rotation_time,
            angle_count: props.angle_count,
            goal: None,
            path: VecDeque::new(),
            next_move: None,
            next_rotate: None,
            in_motion: false,
            has_planned_move: false,
            pathing: PathingMethod::default(),
            attack_move_target: None,
            ram_target: None,
            fleeing: false,
            retreat_side: RetreatSide::default(),
            destroyed: false,
            next_move_charged: false,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_rotation(mut self, rotation_time: f64, angle_count: u32) -> Self {
        self.rotation_time = rotation_time;
        self.angle_count = angle_count;
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    pub fn with_pathing(mut self, pathing: PathingMethod) -> Self {
        self.pathing = pathing;
        self
    }

    pub fn is_rotating(&self) -> bool {
        self.next_rotate.is_some()
    }

    /// Parked on its cell: blocks other units
    pub fn is_stationary(&self) -> bool {
        !self.destroyed && !self.in_motion && !self.is_rotating()
    }

    pub fn is_hostile_to(&self, other: &WarUnit) -> bool {
        self.owner != other.owner
    }

    /// Maximum heading change per tick
    pub fn rotation_step(&self, simulation_delay: f64) -> f64 {
        if self.angle_count == 0 || self.rotation_time <= 0.0 {
            return TAU;
        }
        TAU * self.rotation_time / self.angle_count as f64 / simulation_delay
    }
}
