use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to access settings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse settings file {}: {source}", path.display())]
    ParseSettings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize settings: {0}")]
    SerializeSettings(#[from] toml::ser::Error),
}

impl WorldError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

pub type WorldResult<T> = Result<T, WorldError>;

/// Why a block could not be placed on a cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("cell is outside the world")]
    OutOfBounds,
    #[error("cannot build on water")]
    Water,
    #[error("cell is already occupied")]
    Occupied,
}
