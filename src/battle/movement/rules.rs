//! Obstacle, passability and reservation policy
//!
//! The movement handler asks its `MovementRules` every question about what
//! a unit may enter. The provided methods implement the shared rule set;
//! arena variants override only the hooks that differ.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::battle::location::Location;
use crate::battle::units::WarUnit;
use crate::core::types::UnitId;

/// Rectangular battle arena `[0, width) x [0, height)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaBounds {
    pub width: i32,
    pub height: i32,
}

impl ArenaBounds {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, location: Location) -> bool {
        (0..self.width).contains(&location.x) && (0..self.height).contains(&location.y)
    }
}

/// Read-only snapshot of the roster, reservations and occupancy index
///
/// Handed to planner workers while the tick thread waits on the batch.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    pub units: &'a AHashMap<UnitId, WarUnit>,
    pub reserved: &'a AHashMap<Location, UnitId>,
    pub occupancy: &'a AHashMap<Location, AHashSet<UnitId>>,
}

impl<'a> WorldView<'a> {
    pub fn unit(&self, id: UnitId) -> Option<&'a WarUnit> {
        self.units.get(&id)
    }

    pub fn reserved_by(&self, location: Location) -> Option<UnitId> {
        self.reserved.get(&location).copied()
    }

    /// Units indexed at `location`
    pub fn occupants(&self, location: Location) -> impl Iterator<Item = &'a WarUnit> + 'a {
        let units = self.units;
        self.occupancy
            .get(&location)
            .into_iter()
            .flatten()
            .filter_map(move |id| units.get(id))
    }
}

/// Movement policy of a battle arena
pub trait MovementRules: Send + Sync {
    /// Arena the weight map is sized for
    fn arena(&self) -> ArenaBounds;

    /// Hard obstacle: terrain, buildings, arena edges
    fn is_blocked(&self, unit: &WarUnit, location: Location) -> bool;

    /// Occupants this unit never treats as obstacles
    fn ignores_occupant(&self, _unit: &WarUnit, _occupant: &WarUnit) -> bool {
        false
    }

    /// Extra room a unit needs around `target` before entering it
    fn has_clearance(&self, _view: &WorldView<'_>, _unit: &WarUnit, _target: Location) -> bool {
        true
    }

    /// Cells `unit` covers in the occupancy index when parked at `at`
    fn footprint(&self, _unit: &WarUnit, at: Location) -> Vec<Location> {
        vec![at]
    }

    /// Whether `occupant` leaves `location` open for `unit`
    fn occupant_allows(&self, unit: &WarUnit, occupant: &WarUnit) -> bool {
        occupant.id == unit.id
            || occupant.destroyed
            || occupant.in_motion
            || occupant.is_rotating()
            || (unit.attack_move_target.is_some() && unit.is_hostile_to(occupant))
            || self.ignores_occupant(unit, occupant)
    }

    /// Soft passability: occupants, then clearance
    fn is_passable(&self, view: &WorldView<'_>, unit: &WarUnit, location: Location) -> bool {
        view.occupants(location)
            .all(|occupant| self.occupant_allows(unit, occupant))
            && self.has_clearance(view, unit, location)
    }

    /// A parked unit other than `unit` sits on `location`
    fn has_stationary_occupant(&self, view: &WorldView<'_>, unit: &WarUnit, location: Location) -> bool {
        view.occupants(location).any(|occupant| {
            occupant.id != unit.id
                && occupant.is_stationary()
                && !self.ignores_occupant(unit, occupant)
        })
    }
}

/// Shared rule set: the arena rectangle is the only hard obstacle
#[derive(Debug, Clone, Copy)]
pub struct SimpleMovementRules {
    pub arena: ArenaBounds,
}

impl SimpleMovementRules {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            arena: ArenaBounds::new(width, height),
        }
    }
}

impl MovementRules for SimpleMovementRules {
    fn arena(&self) -> ArenaBounds {
        self.arena
    }

    fn is_blocked(&self, _unit: &WarUnit, location: Location) -> bool {
        !self.arena.contains(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::units::UnitClass;
    use crate::core::types::PlayerId;

    struct Fixture {
        units: AHashMap<UnitId, WarUnit>,
        reserved: AHashMap<Location, UnitId>,
        occupancy: AHashMap<Location, AHashSet<UnitId>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                units: AHashMap::new(),
                reserved: AHashMap::new(),
                occupancy: AHashMap::new(),
            }
        }

        fn place(&mut self, unit: WarUnit) -> UnitId {
            let id = unit.id;
            self.occupancy.entry(unit.location).or_default().insert(id);
            self.units.insert(id, unit);
            id
        }

        fn view(&self) -> WorldView<'_> {
            WorldView {
                units: &self.units,
                reserved: &self.reserved,
                occupancy: &self.occupancy,
            }
        }
    }

    fn unit(owner: u32, at: Location) -> WarUnit {
        WarUnit::new(UnitId::new(), PlayerId(owner), UnitClass::Cruiser, at)
    }

    #[test]
    fn test_arena_bounds() {
        let rules = SimpleMovementRules::new(5, 4);
        let mover = unit(1, Location::of(0, 0));
        assert!(!rules.is_blocked(&mover, Location::of(4, 3)));
        assert!(rules.is_blocked(&mover, Location::of(5, 0)));
        assert!(rules.is_blocked(&mover, Location::of(0, -1)));
    }

    #[test]
    fn test_stationary_occupant_blocks() {
        let rules = SimpleMovementRules::new(10, 10);
        let mut fx = Fixture::new();
        let mover = unit(1, Location::of(0, 0));
        fx.place(unit(1, Location::of(1, 0)));

        assert!(!rules.is_passable(&fx.view(), &mover, Location::of(1, 0)));
        assert!(rules.is_passable(&fx.view(), &mover, Location::of(2, 0)));
        assert!(rules.has_stationary_occupant(&fx.view(), &mover, Location::of(1, 0)));
    }

    #[test]
    fn test_moving_rotating_and_destroyed_occupants_pass() {
        let rules = SimpleMovementRules::new(10, 10);
        let mut fx = Fixture::new();
        let mover = unit(1, Location::of(0, 0));

        let mut moving = unit(1, Location::of(1, 0));
        moving.in_motion = true;
        fx.place(moving);

        let mut turning = unit(1, Location::of(2, 0));
        turning.next_rotate = Some(Location::of(2, 1));
        fx.place(turning);

        let mut wreck = unit(1, Location::of(3, 0));
        wreck.destroyed = true;
        fx.place(wreck);

        for x in 1..=3 {
            assert!(rules.is_passable(&fx.view(), &mover, Location::of(x, 0)));
        }
    }

    #[test]
    fn test_attack_move_passes_hostiles_only() {
        let rules = SimpleMovementRules::new(10, 10);
        let mut fx = Fixture::new();
        fx.place(unit(2, Location::of(1, 0)));
        fx.place(unit(1, Location::of(2, 0)));

        let mut mover = unit(1, Location::of(0, 0));
        assert!(!rules.is_passable(&fx.view(), &mover, Location::of(1, 0)));

        mover.attack_move_target = Some(UnitId::new());
        assert!(rules.is_passable(&fx.view(), &mover, Location::of(1, 0)));
        assert!(!rules.is_passable(&fx.view(), &mover, Location::of(2, 0)));
    }

    #[test]
    fn test_unit_never_blocks_itself() {
        let rules = SimpleMovementRules::new(10, 10);
        let mut fx = Fixture::new();
        let mover = unit(1, Location::of(4, 4));
        fx.place(mover.clone());
        assert!(rules.is_passable(&fx.view(), &mover, Location::of(4, 4)));
    }
}
