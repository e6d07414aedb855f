//! Engine-level simulation core
//!
//! Nothing in here knows about players or zombies:
//! - Fixed timestep only
//! - Stable iteration order (insertion order, never hash order)
//! - No rendering or platform dependencies

pub mod bounds;
pub mod collider;
pub mod collider_world;
pub mod collision;
pub mod game_loop;
pub mod pathfinder;
pub mod quadtree;
pub mod timer;
pub mod vector;
pub mod worker;

pub use bounds::Bounds;
pub use collider::{Collider, ColliderId, CollisionGroup, GroupMask, Shape};
pub use collider_world::{ColliderWorld, Contact, MaskPolicy};
pub use collision::{CollisionResult, collide, line_intersection};
pub use game_loop::{FrameHandler, GameLoop};
pub use pathfinder::{Cell, Obstacle, PathFinder};
pub use quadtree::Quadtree;
pub use timer::IntervalMap;
pub use vector::{VectorExt, from_angle};
pub use worker::WorkerPool;
