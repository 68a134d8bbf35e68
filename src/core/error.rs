use thiserror::Error;

use crate::spatial::pathfinding::PathError;
use crate::spatial::site::SiteError;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Path error: {0}")]
    Path(#[from] PathError),

    #[error("Site error: {0}")]
    Site(#[from] SiteError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
