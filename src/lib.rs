//! War Movement - grid pathfinding and unit movement for battle simulation

pub mod battle;
pub mod core;
