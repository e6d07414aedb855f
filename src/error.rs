//! Error types
//!
//! Setup failures are fatal and go back to whoever embeds the game. Entity
//! errors happen mid-tick and are logged and skipped by the world.

use thiserror::Error;

use crate::sim::ColliderId;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("map has no tile sheet to render from")]
    MissingTileSheet,

    #[error("tile `{0}` is not registered")]
    UnknownTile(String),

    #[error("map has no tiles")]
    EmptyMap,

    #[error("map row {row} has {found} tiles, expected {expected}")]
    RaggedMap {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("failed to parse settings: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("game initialization did not complete")]
    InitAborted,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error("collider {0:?} is not registered with the collider world")]
    MissingCollider(ColliderId),
}

pub type SetupResult<T> = Result<T, SetupError>;
