//! Gameplay layer
//!
//! Entities, map, camera and the world that ties them to the simulation
//! core in [`crate::sim`]. Rendering and input stay behind the
//! [`render::RenderSurface`] trait and [`input::InputSnapshot`].

pub mod camera;
pub mod entity;
pub mod input;
pub mod map;
pub mod player;
pub mod projectile;
pub mod render;
pub mod seeker;
pub mod session;
pub mod world;

pub use camera::{Camera, Viewport};
pub use entity::{Entity, EntityId, Health, Owner};
pub use input::{Control, InputSnapshot, MouseState};
pub use map::{TileLocation, TileMap, parse_string_matrix};
pub use player::{Player, ShotRequest, Weapon};
pub use projectile::{Bullet, Explosion, Grenade};
pub use render::{DrawCommand, DrawRecorder, RenderSurface};
pub use seeker::{AiOutcome, AiRequest, AiResult, Crowd, Seeker, SeekerKind};
pub use session::Game;
pub use world::World;
