//! Movement engine configuration with documented constants
//!
//! Every tuning knob of the planner and the per-tick state machine lives
//! here. Values can be loaded from TOML; missing keys fall back to the
//! defaults in `battle::constants`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::constants::{
    DEFAULT_ANGLE_TOLERANCE, DEFAULT_CONGESTION_FACTOR, DEFAULT_MAX_EXPANDED_NODES,
    DEFAULT_PLANNING_BATCH_SIZE, DEFAULT_PLANNING_RETRIES, DEFAULT_REPLAN_CHANCE,
    DEFAULT_SIMULATION_DELAY, DEFAULT_WEIGHT_MAP_MARGIN,
};
use crate::core::error::{MovementError, Result};

/// Configuration for the movement engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    // === PLANNING ===
    /// Maximum number of planning requests drained per tick
    ///
    /// Bounds the latency `do_path_plannings` adds to a tick: the tick
    /// thread waits for the whole batch.
    pub planning_batch_size: usize,

    /// Attempts a request gets before it is dropped and the unit idles
    pub planning_retries: u32,

    /// Planning worker threads (0 = one per core)
    pub worker_threads: usize,

    /// Cap on A* node expansions per search
    ///
    /// Hitting the cap behaves like an exhausted open set: the search
    /// returns its best approximate path. `None` disables the cap.
    pub max_expanded_nodes: Option<usize>,

    // === CONGESTION ===
    /// Edge cost multiplier per unit of cell weight
    ///
    /// At 0.05 a cell crossed by 20 planned paths costs twice as much.
    pub congestion_factor: f64,

    /// Extra cells the weight map keeps around the arena on every side
    pub weight_map_margin: i32,

    // === STATE MACHINE ===
    /// Chance per tick that an idle-at-cell unit replans proactively
    pub replan_chance: f64,

    /// Simulation delay divisor of the per-tick rotation step
    pub simulation_delay: f64,

    /// Heading error (radians) under which rotation counts as complete
    pub angle_tolerance: f64,

    /// Treat spatial index inconsistencies as errors instead of warnings
    pub strict_spatial_index: bool,

    /// Seed for the replan roll; entropy when absent
    pub seed: Option<u64>,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            planning_batch_size: DEFAULT_PLANNING_BATCH_SIZE,
            planning_retries: DEFAULT_PLANNING_RETRIES,
            worker_threads: 0,
            max_expanded_nodes: Some(DEFAULT_MAX_EXPANDED_NODES),
            congestion_factor: DEFAULT_CONGESTION_FACTOR,
            weight_map_margin: DEFAULT_WEIGHT_MAP_MARGIN,
            replan_chance: DEFAULT_REPLAN_CHANCE,
            simulation_delay: DEFAULT_SIMULATION_DELAY,
            angle_tolerance: DEFAULT_ANGLE_TOLERANCE,
            strict_spatial_index: false,
            seed: None,
        }
    }
}

impl MovementConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic config for tests and replays: fixed seed, no random replans
    pub fn deterministic(seed: u64) -> Self {
        Self {
            replan_chance: 0.0,
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: MovementConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.planning_batch_size == 0 {
            return Err(MovementError::InvalidConfig(
                "planning_batch_size must be at least 1".into(),
            ));
        }

        if self.planning_retries == 0 {
            return Err(MovementError::InvalidConfig(
                "planning_retries must be at least 1".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.replan_chance) {
            return Err(MovementError::InvalidConfig(format!(
                "replan_chance ({}) must be within [0, 1]",
                self.replan_chance
            )));
        }

        if !(self.congestion_factor >= 0.0) {
            return Err(MovementError::InvalidConfig(format!(
                "congestion_factor ({}) must not be negative",
                self.congestion_factor
            )));
        }

        if !(self.simulation_delay > 0.0) {
            return Err(MovementError::InvalidConfig(format!(
                "simulation_delay ({}) must be positive",
                self.simulation_delay
            )));
        }

        if !(self.angle_tolerance > 0.0) {
            return Err(MovementError::InvalidConfig(
                "angle_tolerance must be positive".into(),
            ));
        }

        if self.weight_map_margin < 0 {
            return Err(MovementError::InvalidConfig(
                "weight_map_margin must not be negative".into(),
            ));
        }

        Ok(())
    }
}
