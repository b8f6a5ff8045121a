pub mod config;
pub mod error;
pub mod types;

pub use config::MovementConfig;
pub use error::{MovementError, Result};
pub use types::{PlayerId, RetreatSide, UnitId};
