//! Batched, retrying path computation off the tick thread
//!
//! Requests queue up per unit (a newer request for the same unit replaces
//! the older one in place). Each tick a bounded batch runs on the planner's
//! worker pool while the tick thread waits for all of it; results come back
//! in submission order.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use ahash::AHashMap;
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::battle::location::Location;
use crate::battle::pathfinding::{GridRules, Pathfinding};
use crate::battle::units::WarUnit;
use crate::core::config::MovementConfig;
use crate::core::error::Result;
use crate::core::types::UnitId;

/// One planning request and, after execution, its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct PathPlanning {
    pub unit: UnitId,
    pub goal: Location,
    /// Cell the search started from (in-flight target for moving units)
    pub current: Location,
    pub retries_left: u32,
    pub found: bool,
    pub path: Vec<Location>,
}

impl PathPlanning {
    pub fn new(unit: UnitId, goal: Location, retries: u32) -> Self {
        Self {
            unit,
            goal,
            current: goal,
            retries_left: retries,
            found: false,
            path: Vec::new(),
        }
    }

    /// Where a fresh path for `unit` has to start
    pub fn resolve_current(unit: &WarUnit) -> Location {
        match unit.next_move {
            Some(target) if unit.in_motion => target,
            _ => unit.location,
        }
    }

    pub fn execute<R: GridRules>(&mut self, unit: &WarUnit, pathfinding: &Pathfinding<R>) {
        self.current = Self::resolve_current(unit);
        let result = pathfinding.search_approximate(self.current, self.goal);
        self.found = result.found;
        self.path = result.path;
    }

    fn reset_outcome(&mut self) {
        self.found = false;
        self.path.clear();
    }
}

/// Pending requests plus the worker pool that executes them
pub struct PathPlanner {
    pending: AHashMap<UnitId, PathPlanning>,
    queue: VecDeque<UnitId>,
    pool: ThreadPool,
    batch_size: usize,
    retries: u32,
}

impl PathPlanner {
    pub fn new(config: &MovementConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("path-planner-{}", i))
            .build()?;

        Ok(Self {
            pending: AHashMap::new(),
            queue: VecDeque::new(),
            pool,
            batch_size: config.planning_batch_size,
            retries: config.planning_retries,
        })
    }

    /// Queue a request, replacing any older one for the same unit
    pub fn request(&mut self, unit: UnitId, goal: Location) {
        let planning = PathPlanning::new(unit, goal, self.retries);
        if self.pending.insert(unit, planning).is_none() {
            self.queue.push_back(unit);
        }
    }

    pub fn cancel(&mut self, unit: UnitId) {
        if self.pending.remove(&unit).is_some() {
            self.queue.retain(|&id| id != unit);
        }
    }

    pub fn is_pending(&self, unit: UnitId) -> bool {
        self.pending.contains_key(&unit)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove up to one batch of the oldest requests
    pub fn take_batch(&mut self) -> Vec<PathPlanning> {
        let mut batch = Vec::with_capacity(self.batch_size.min(self.queue.len()));
        while batch.len() < self.batch_size {
            let Some(unit) = self.queue.pop_front() else {
                break;
            };
            if let Some(planning) = self.pending.remove(&unit) {
                batch.push(planning);
            }
        }
        batch
    }

    /// Run `plan` on every request in the pool and wait for all of them
    ///
    /// A panicking task is logged and reported as not found.
    pub fn run_batch<F>(&self, batch: Vec<PathPlanning>, plan: F) -> Vec<PathPlanning>
    where
        F: Fn(&mut PathPlanning) + Send + Sync,
    {
        if batch.is_empty() {
            return batch;
        }

        self.pool.install(|| {
            batch
                .into_par_iter()
                .map(|mut planning| {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| plan(&mut planning)));
                    if outcome.is_err() {
                        tracing::error!(
                            "Path planning for unit {:?} panicked; treating as not found",
                            planning.unit
                        );
                        planning.reset_outcome();
                    }
                    planning
                })
                .collect()
        })
    }

    /// Spend one retry on a failed request
    ///
    /// Returns false once the budget is exhausted and the request is dropped.
    pub fn retry(&mut self, mut planning: PathPlanning) -> bool {
        planning.retries_left = planning.retries_left.saturating_sub(1);
        if planning.retries_left == 0 {
            return false;
        }
        if self.pending.contains_key(&planning.unit) {
            // Superseded by a newer request
            return true;
        }
        planning.reset_outcome();
        self.queue.push_back(planning.unit);
        self.pending.insert(planning.unit, planning);
        true
    }
}
