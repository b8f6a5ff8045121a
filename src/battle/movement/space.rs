//! Space battles
//!
//! `SpaceMovementRules` opens the arena edge on a fleeing unit's retreat
//! side and lets ramming units ignore their target. `FullSpaceMovementRules`
//! adds exclusion zones: large ships keep the eight cells around their
//! target clear of other large ships, and stations cover a 3x3 block.

use crate::battle::location::Location;
use crate::battle::movement::handler::WarMovementHandler;
use crate::battle::movement::rules::{ArenaBounds, MovementRules, WorldView};
use crate::battle::units::WarUnit;
use crate::core::types::RetreatSide;

pub type SpaceWarMovementHandler = WarMovementHandler<SpaceMovementRules>;
pub type FullSpaceWarMovementHandler = WarMovementHandler<FullSpaceMovementRules>;

#[derive(Debug, Clone, Copy)]
pub struct SpaceMovementRules {
    pub arena: ArenaBounds,
    /// Extra columns a fleeing unit may use beyond its retreat edge
    pub retreat_margin: i32,
}

impl SpaceMovementRules {
    pub fn new(width: i32, height: i32, retreat_margin: i32) -> Self {
        Self {
            arena: ArenaBounds::new(width, height),
            retreat_margin,
        }
    }

    fn x_range(&self, unit: &WarUnit) -> (i32, i32) {
        let (mut min_x, mut max_x) = (0, self.arena.width);
        if unit.fleeing {
            match unit.retreat_side {
                RetreatSide::West => min_x -= self.retreat_margin,
                RetreatSide::East => max_x += self.retreat_margin,
            }
        }
        (min_x, max_x)
    }
}

impl MovementRules for SpaceMovementRules {
    fn arena(&self) -> ArenaBounds {
        self.arena
    }

    fn is_blocked(&self, unit: &WarUnit, location: Location) -> bool {
        let (min_x, max_x) = self.x_range(unit);
        !(min_x..max_x).contains(&location.x) || !(0..self.arena.height).contains(&location.y)
    }

    fn ignores_occupant(&self, unit: &WarUnit, occupant: &WarUnit) -> bool {
        unit.ram_target == Some(occupant.id)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FullSpaceMovementRules {
    pub space: SpaceMovementRules,
}

impl FullSpaceMovementRules {
    pub fn new(width: i32, height: i32, retreat_margin: i32) -> Self {
        Self {
            space: SpaceMovementRules::new(width, height, retreat_margin),
        }
    }

    /// Another large ship holds or is entering `location`
    fn crowds(&self, unit: &WarUnit, other: &WarUnit) -> bool {
        other.id != unit.id
            && !other.destroyed
            && !other.class.is_fighter()
            && !self.space.ignores_occupant(unit, other)
    }
}

impl MovementRules for FullSpaceMovementRules {
    fn arena(&self) -> ArenaBounds {
        self.space.arena()
    }

    fn is_blocked(&self, unit: &WarUnit, location: Location) -> bool {
        self.space.is_blocked(unit, location)
    }

    fn ignores_occupant(&self, unit: &WarUnit, occupant: &WarUnit) -> bool {
        self.space.ignores_occupant(unit, occupant)
    }

    fn has_clearance(&self, view: &WorldView<'_>, unit: &WarUnit, target: Location) -> bool {
        if !unit.class.needs_clearance() {
            return true;
        }
        target.neighbors().into_iter().all(|cell| {
            let occupied = view.occupants(cell).any(|other| self.crowds(unit, other));
            let reserved = view
                .reserved_by(cell)
                .and_then(|holder| view.unit(holder))
                .is_some_and(|other| self.crowds(unit, other));
            !occupied && !reserved
        })
    }

    fn footprint(&self, unit: &WarUnit, at: Location) -> Vec<Location> {
        if unit.class.is_station() {
            let mut cells = Vec::with_capacity(9);
            cells.push(at);
            cells.extend(at.neighbors());
            cells
        } else {
            vec![at]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::movement::MovementHandler;
    use crate::battle::units::UnitClass;
    use crate::core::config::MovementConfig;
    use crate::core::types::{PlayerId, UnitId};
    use ahash::{AHashMap, AHashSet};

    fn ship(class: UnitClass, owner: u32, at: Location) -> WarUnit {
        WarUnit::new(UnitId::new(), PlayerId(owner), class, at)
    }

    fn config() -> MovementConfig {
        MovementConfig {
            worker_threads: 1,
            ..MovementConfig::deterministic(9)
        }
    }

    #[test]
    fn test_fleeing_unit_may_leave_on_retreat_side() {
        let rules = SpaceMovementRules::new(20, 10, 4);
        let mut unit = ship(UnitClass::Cruiser, 1, Location::of(0, 5));
        assert!(rules.is_blocked(&unit, Location::of(-2, 5)));

        unit.fleeing = true;
        assert!(!rules.is_blocked(&unit, Location::of(-2, 5)));
        assert!(rules.is_blocked(&unit, Location::of(-5, 5)));
        assert!(rules.is_blocked(&unit, Location::of(20, 5)));

        unit.retreat_side = RetreatSide::East;
        assert!(!rules.is_blocked(&unit, Location::of(23, 5)));
        assert!(rules.is_blocked(&unit, Location::of(-1, 5)));
        assert!(rules.is_blocked(&unit, Location::of(21, 10)));
    }

    #[test]
    fn test_ram_target_is_not_an_obstacle() {
        let rules = SpaceMovementRules::new(20, 10, 4);
        let target = ship(UnitClass::Battleship, 2, Location::of(5, 5));
        let target_id = target.id;

        let mut units = AHashMap::new();
        let mut occupancy: AHashMap<Location, AHashSet<UnitId>> = AHashMap::new();
        occupancy.entry(target.location).or_default().insert(target_id);
        units.insert(target_id, target);
        let reserved = AHashMap::new();
        let view = WorldView {
            units: &units,
            reserved: &reserved,
            occupancy: &occupancy,
        };

        let mut fighter = ship(UnitClass::Fighter, 1, Location::of(3, 5));
        assert!(!rules.is_passable(&view, &fighter, Location::of(5, 5)));
        fighter.ram_target = Some(target_id);
        assert!(rules.is_passable(&view, &fighter, Location::of(5, 5)));
        assert!(!rules.has_stationary_occupant(&view, &fighter, Location::of(5, 5)));
    }

    #[test]
    fn test_exclusion_zone_around_large_ships() {
        let mut handler = FullSpaceWarMovementHandler::new(FullSpaceMovementRules::new(20, 10, 4), config()).unwrap();
        handler.add_unit(ship(UnitClass::Battleship, 1, Location::of(5, 5))).unwrap();

        let cruiser = ship(UnitClass::Cruiser, 1, Location::of(8, 5));
        let fighter = ship(UnitClass::Fighter, 1, Location::of(8, 6));
        let cruiser_id = cruiser.id;
        let fighter_id = fighter.id;
        handler.add_unit(cruiser).unwrap();
        handler.add_unit(fighter).unwrap();

        let cruiser_grid = handler.pathfinding_for(cruiser_id).unwrap();
        assert!(!cruiser_grid.is_passable(Location::of(6, 5)));
        assert!(!cruiser_grid.is_passable(Location::of(4, 4)));
        assert!(cruiser_grid.is_passable(Location::of(7, 5)));

        let fighter_grid = handler.pathfinding_for(fighter_id).unwrap();
        assert!(fighter_grid.is_passable(Location::of(6, 5)));
    }

    #[test]
    fn test_fighters_do_not_crowd_large_ships() {
        let rules = FullSpaceMovementRules::new(20, 10, 4);
        let swarm = ship(UnitClass::Fighter, 2, Location::of(5, 5));

        let mut units = AHashMap::new();
        let mut occupancy: AHashMap<Location, AHashSet<UnitId>> = AHashMap::new();
        occupancy.entry(swarm.location).or_default().insert(swarm.id);
        units.insert(swarm.id, swarm);
        let reserved = AHashMap::new();
        let view = WorldView {
            units: &units,
            reserved: &reserved,
            occupancy: &occupancy,
        };

        let capital = ship(UnitClass::CapitalShip, 1, Location::of(8, 5));
        assert!(rules.has_clearance(&view, &capital, Location::of(6, 5)));
    }

    #[test]
    fn test_reserved_neighbour_breaks_clearance() {
        let rules = FullSpaceMovementRules::new(20, 10, 4);
        let other = ship(UnitClass::Cruiser, 1, Location::of(2, 2));
        let other_id = other.id;

        let mut units = AHashMap::new();
        units.insert(other_id, other);
        let occupancy = AHashMap::new();
        let mut reserved = AHashMap::new();
        reserved.insert(Location::of(5, 4), other_id);
        let view = WorldView {
            units: &units,
            reserved: &reserved,
            occupancy: &occupancy,
        };

        let mover = ship(UnitClass::Battleship, 1, Location::of(8, 5));
        assert!(!rules.has_clearance(&view, &mover, Location::of(5, 5)));
        assert!(rules.has_clearance(&view, &mover, Location::of(5, 7)));
    }

    #[test]
    fn test_station_covers_three_by_three() {
        let mut handler = FullSpaceWarMovementHandler::new(FullSpaceMovementRules::new(20, 10, 4), config()).unwrap();
        let station = ship(UnitClass::Station, 1, Location::of(10, 5));
        let station_id = station.id;
        handler.add_unit(station).unwrap();

        for cell in Location::of(10, 5).neighbors() {
            assert_eq!(handler.occupants(cell), vec![station_id]);
        }
        assert!(handler.occupants(Location::of(12, 5)).is_empty());

        let fighter = ship(UnitClass::Fighter, 2, Location::of(13, 5));
        let fighter_id = fighter.id;
        handler.add_unit(fighter).unwrap();
        let grid = handler.pathfinding_for(fighter_id).unwrap();
        assert!(!grid.is_passable(Location::of(11, 5)));
        assert!(grid.is_passable(Location::of(12, 5)));
    }

    #[test]
    fn test_cruiser_route_keeps_berth_from_battleship() {
        let mut handler = FullSpaceWarMovementHandler::new(FullSpaceMovementRules::new(12, 8, 4), config()).unwrap();
        handler.add_unit(ship(UnitClass::Battleship, 1, Location::of(5, 2))).unwrap();
        let cruiser = ship(UnitClass::Cruiser, 1, Location::of(0, 2));
        let id = cruiser.id;
        handler.add_unit(cruiser).unwrap();

        handler.set_movement_goal(id, Location::of(10, 2)).unwrap();
        handler.do_path_plannings();

        let path = &handler.unit(id).unwrap().path;
        assert_eq!(path.back(), Some(&Location::of(10, 2)));
        assert!(path.iter().all(|cell| cell.chebyshev(&Location::of(5, 2)) >= 2));
    }
}
