use thiserror::Error;

use crate::battle::location::Location;
use crate::core::types::UnitId;

#[derive(Error, Debug)]
pub enum MovementError {
    #[error("Unit not found: {0:?}")]
    UnknownUnit(UnitId),

    #[error("Unit already registered: {0:?}")]
    DuplicateUnit(UnitId),

    #[error("Spatial index inconsistency: unit {unit:?} expected at {location}")]
    IndexInconsistency { unit: UnitId, location: Location },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, MovementError>;
