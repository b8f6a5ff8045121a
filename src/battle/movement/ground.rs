//! Ground battles: arena edges plus placed structures

use crate::battle::location::Location;
use crate::battle::movement::handler::WarMovementHandler;
use crate::battle::movement::rules::{ArenaBounds, MovementRules};
use crate::battle::placement::PlacementGrid;
use crate::battle::units::WarUnit;

pub type GroundWarMovementHandler = WarMovementHandler<GroundMovementRules>;

#[derive(Debug, Clone)]
pub struct GroundMovementRules {
    pub arena: ArenaBounds,
    pub placement: PlacementGrid,
}

impl GroundMovementRules {
    pub fn new(width: i32, height: i32, placement: PlacementGrid) -> Self {
        Self {
            arena: ArenaBounds::new(width, height),
            placement,
        }
    }
}

impl MovementRules for GroundMovementRules {
    fn arena(&self) -> ArenaBounds {
        self.arena
    }

    fn is_blocked(&self, _unit: &WarUnit, location: Location) -> bool {
        !self.arena.contains(location) || self.placement.is_blocked(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::movement::MovementHandler;
    use crate::battle::placement::Structure;
    use crate::battle::units::UnitClass;
    use crate::core::config::MovementConfig;
    use crate::core::types::{PlayerId, UnitId};

    fn walled_rules() -> GroundMovementRules {
        // Wall along x = 3 with a gap at y = 4
        let wall = Structure {
            origin: Location::of(3, 0),
            width: 1,
            height: 4,
        };
        GroundMovementRules::new(8, 6, PlacementGrid::from_structures(&[wall]))
    }

    #[test]
    fn test_structures_are_hard_obstacles() {
        let rules = walled_rules();
        let tank = WarUnit::new(UnitId::new(), PlayerId(1), UnitClass::GroundVehicle, Location::of(0, 0));
        assert!(rules.is_blocked(&tank, Location::of(3, 2)));
        assert!(!rules.is_blocked(&tank, Location::of(3, 4)));
        assert!(rules.is_blocked(&tank, Location::of(8, 0)));
    }

    #[test]
    fn test_path_goes_through_gap() {
        let config = MovementConfig {
            worker_threads: 1,
            ..MovementConfig::deterministic(5)
        };
        let mut handler = GroundWarMovementHandler::new(walled_rules(), config).unwrap();
        let tank = WarUnit::new(UnitId::new(), PlayerId(1), UnitClass::GroundVehicle, Location::of(1, 1));
        let id = tank.id;
        handler.add_unit(tank).unwrap();

        handler.set_movement_goal(id, Location::of(5, 1)).unwrap();
        handler.do_path_plannings();

        let path = &handler.unit(id).unwrap().path;
        assert_eq!(path.back(), Some(&Location::of(5, 1)));
        assert!(path.iter().any(|cell| cell.x == 3));
        assert!(path.iter().all(|&cell| cell.x != 3 || cell.y >= 4));
    }
}
