//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for units taking part in a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub Uuid);

impl UnitId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of a unit (empire / player slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Side of the arena a fleeing unit escapes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RetreatSide {
    #[default]
    West,
    East,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_ids_are_unique() {
        assert_ne!(UnitId::new(), UnitId::new());
    }

    #[test]
    fn test_player_id_equality() {
        assert_eq!(PlayerId(1), PlayerId(1));
        assert_ne!(PlayerId(1), PlayerId(2));
    }
}
