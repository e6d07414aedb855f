//! Horde - simulation core for a top-down twin-stick shooter
//!
//! Core modules:
//! - `sim`: Engine core (fixed-step loop, collider world, quadtree, A*, workers)
//! - `game`: Player, seekers, projectiles, map, camera and the world that runs them
//! - `settings`: Data-driven tuning
//! - `error`: Setup and per-entity error types

pub mod error;
pub mod game;
pub mod settings;
pub mod sim;

pub use error::{EntityError, SetupError, SetupResult};
pub use game::{Game, World};
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const STEP: f32 = 1.0 / 60.0;

    /// Entities this far outside the viewport are still drawn
    pub const RENDER_DISTANCE_OFFSET: f32 = 50.0;

    /// Seekers spawn at least this far from the player when the map allows it
    pub const SPAWN_CLEARANCE: f32 = 160.0;
}
