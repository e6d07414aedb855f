//! Game settings and tuning
//!
//! Every section deserializes with defaults, so a settings file only needs
//! the values it changes. Units: distances in world units, speeds in world
//! units per second (or force per unit mass where noted), times in ms.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SetupError, SetupResult};
use crate::sim::MaskPolicy;

/// World construction and shared infrastructure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Seed for spawn placement
    pub seed: u64,
    pub zombie_count: usize,
    pub devil_count: usize,

    // === Broad phase ===
    pub quadtree_capacity: usize,
    pub quadtree_max_depth: u32,
    /// Extra room around the map so boundary walls fit inside the root
    pub quadtree_margin: f32,

    // === Collision ===
    pub mask_policy: MaskPolicy,
    pub restitution: f32,
    /// Thickness of the four walls enclosing the map
    pub boundary_thickness: f32,

    // === Pathfinding / workers ===
    pub path_node_size: f32,
    /// Other seekers within this distance block path cells (0 ignores them)
    pub crowd_avoid_range: f32,
    /// 0 runs AI jobs inline on the simulation thread
    pub worker_threads: usize,
    pub worker_queue_capacity: usize,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            zombie_count: 100,
            devil_count: 1,

            quadtree_capacity: 12,
            quadtree_max_depth: 15,
            quadtree_margin: 100.0,

            mask_policy: MaskPolicy::Symmetric,
            restitution: 0.0,
            boundary_thickness: 100.0,

            path_node_size: 32.0,
            crowd_avoid_range: 96.0,
            worker_threads: 2,
            worker_queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSettings {
    /// Movement force per unit mass
    pub speed: f32,
    /// Dash force per unit mass
    pub dash_speed: f32,
    pub dash_interval_ms: f64,
    pub shoot_interval_ms: f64,
    pub mass: f32,
    pub radius: f32,
    pub friction: f32,
    pub max_health: f32,
    /// Bullets spawn this far along the aim from the player's render position
    pub shoot_offset: f32,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            speed: 1000.0,
            dash_speed: 15000.0,
            dash_interval_ms: 1000.0,
            shoot_interval_ms: 250.0,
            mass: 250.0,
            radius: 5.0,
            friction: 0.1,
            max_health: 100.0,
            shoot_offset: 30.0,
        }
    }
}

/// Tuning shared by every seeker kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekerSettings {
    /// Steering force per unit mass
    pub speed: f32,
    /// Damage per contact hit on the player
    pub damage: f32,
    pub health: f32,
    pub radius: f32,
    pub mass: f32,
    pub friction: f32,
    pub line_of_sight_interval_ms: f64,
    pub path_interval_ms: f64,
    /// Minimum time between two contact hits
    pub attack_interval_ms: f64,
    /// Within this distance and with a clear line, steering force is multiplied
    pub charge_distance: f32,
    pub charge_multiplier: f32,
}

impl SeekerSettings {
    pub fn zombie() -> Self {
        Self {
            speed: 200.0,
            damage: 1.0,
            health: 100.0,
            radius: 5.0,
            mass: 100.0,
            friction: 0.1,
            line_of_sight_interval_ms: 100.0,
            path_interval_ms: 150.0,
            attack_interval_ms: 500.0,
            charge_distance: 0.0,
            charge_multiplier: 1.0,
        }
    }

    pub fn devil() -> Self {
        Self {
            speed: 200.0,
            damage: 20.0,
            health: 1000.0,
            radius: 8.0,
            mass: 400.0,
            charge_distance: 150.0,
            charge_multiplier: 1.5,
            ..Self::zombie()
        }
    }
}

impl Default for SeekerSettings {
    fn default() -> Self {
        Self::zombie()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletSettings {
    /// Muzzle velocity
    pub speed: f32,
    pub max_distance: f32,
    pub damage: f32,
    /// Seekers a bullet can hit before it is spent
    pub penetration: u32,
    pub radius: f32,
}

impl Default for BulletSettings {
    fn default() -> Self {
        Self {
            speed: 600.0,
            max_distance: 200.0,
            damage: 30.0,
            penetration: 1,
            radius: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrenadeSettings {
    pub detonation_ms: f64,
    pub aoe: f32,
    /// Knock-back force per unit mass per unit of depth inside the blast
    pub knockback: f32,
    /// Initial thrust per unit mass
    pub speed: f32,
    /// Thrust multiplier applied every fixed tick
    pub decay: f32,
    pub damage: f32,
    pub mass: f32,
    pub friction: f32,
    pub radius: f32,
    pub explosion_lifetime_ms: f64,
}

impl Default for GrenadeSettings {
    fn default() -> Self {
        Self {
            detonation_ms: 1000.0,
            aoe: 60.0,
            knockback: 250.0,
            speed: 5000.0,
            decay: 0.8,
            damage: 80.0,
            mass: 5.0,
            friction: 0.05,
            radius: 3.0,
            explosion_lifetime_ms: 400.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub screen_width: f32,
    pub screen_height: f32,
    /// Visible world width after zoom
    pub view_width: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            screen_width: 1280.0,
            screen_height: 720.0,
            view_width: 400.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Fixed step in seconds
    pub step: f64,
    /// FPS averaging window in seconds
    pub fps_window: f64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            step: crate::consts::STEP as f64,
            fps_window: 0.5,
        }
    }
}

/// All tuning for one game session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub world: WorldSettings,
    pub player: PlayerSettings,
    pub zombie: SeekerSettings,
    pub devil: SeekerSettings,
    pub bullet: BulletSettings,
    pub grenade: GrenadeSettings,
    pub camera: CameraSettings,
    pub game_loop: LoopSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            world: WorldSettings::default(),
            player: PlayerSettings::default(),
            zombie: SeekerSettings::zombie(),
            devil: SeekerSettings::devil(),
            bullet: BulletSettings::default(),
            grenade: GrenadeSettings::default(),
            camera: CameraSettings::default(),
            game_loop: LoopSettings::default(),
        }
    }
}

/// Minimum dash cooldown
pub const MIN_DASH_INTERVAL_MS: f64 = 1000.0;
/// Minimum shoot cooldown
pub const MIN_SHOOT_INTERVAL_MS: f64 = 250.0;

fn invalid(name: &'static str, reason: impl Into<String>) -> SetupError {
    SetupError::InvalidSetting {
        name,
        reason: reason.into(),
    }
}

fn positive(name: &'static str, value: f32) -> SetupResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(name, format!("must be positive, got {value}")))
    }
}

fn friction(name: &'static str, value: f32) -> SetupResult<()> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(name, format!("must be in [0, 1), got {value}")))
    }
}

impl Settings {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> SetupResult<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a JSON settings file
    pub fn load(path: impl AsRef<Path>) -> SetupResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json(&self) -> SetupResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> SetupResult<()> {
        let w = &self.world;
        if w.quadtree_capacity == 0 {
            return Err(invalid("world.quadtree_capacity", "must be at least 1"));
        }
        positive("world.path_node_size", w.path_node_size)?;
        if w.crowd_avoid_range.is_nan() || w.crowd_avoid_range < 0.0 {
            return Err(invalid("world.crowd_avoid_range", "must be zero or more"));
        }
        if !(0.0..=1.0).contains(&w.restitution) {
            return Err(invalid("world.restitution", "must be in [0, 1]"));
        }
        if w.worker_queue_capacity == 0 {
            return Err(invalid("world.worker_queue_capacity", "must be at least 1"));
        }

        let p = &self.player;
        positive("player.mass", p.mass)?;
        positive("player.radius", p.radius)?;
        positive("player.max_health", p.max_health)?;
        friction("player.friction", p.friction)?;
        if p.dash_interval_ms < MIN_DASH_INTERVAL_MS {
            return Err(invalid(
                "player.dash_interval_ms",
                format!("must be at least {MIN_DASH_INTERVAL_MS}"),
            ));
        }
        if p.shoot_interval_ms < MIN_SHOOT_INTERVAL_MS {
            return Err(invalid(
                "player.shoot_interval_ms",
                format!("must be at least {MIN_SHOOT_INTERVAL_MS}"),
            ));
        }

        for (mass, radius, fr, health, s) in [
            ("zombie.mass", "zombie.radius", "zombie.friction", "zombie.health", &self.zombie),
            ("devil.mass", "devil.radius", "devil.friction", "devil.health", &self.devil),
        ] {
            positive(mass, s.mass)?;
            positive(radius, s.radius)?;
            positive(health, s.health)?;
            friction(fr, s.friction)?;
        }

        positive("bullet.radius", self.bullet.radius)?;
        positive("bullet.max_distance", self.bullet.max_distance)?;

        let g = &self.grenade;
        positive("grenade.mass", g.mass)?;
        positive("grenade.radius", g.radius)?;
        positive("grenade.aoe", g.aoe)?;
        friction("grenade.friction", g.friction)?;
        if !(g.decay > 0.0 && g.decay <= 1.0) {
            return Err(invalid("grenade.decay", "must be in (0, 1]"));
        }

        positive("camera.view_width", self.camera.view_width)?;
        positive("camera.screen_width", self.camera.screen_width)?;
        positive("camera.screen_height", self.camera.screen_height)?;

        if !(self.game_loop.step > 0.0) {
            return Err(invalid("game_loop.step", "must be positive"));
        }
        if !(self.game_loop.fps_window > 0.0) {
            return Err(invalid("game_loop.fps_window", "must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert_eq!(s.zombie.damage, 1.0);
        assert_eq!(s.devil.health, 1000.0);
        assert_eq!(s.world.quadtree_capacity, 12);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s = Settings::from_json_str(r#"{ "world": { "zombie_count": 7 }, "player": { "speed": 500 } }"#)
            .unwrap();
        assert_eq!(s.world.zombie_count, 7);
        assert_eq!(s.world.devil_count, 1);
        assert_eq!(s.player.speed, 500.0);
        assert_eq!(s.player.mass, 250.0);
        assert_eq!(s.grenade.aoe, 60.0);
    }

    #[test]
    fn test_rejects_short_dash_cooldown() {
        let err = Settings::from_json_str(r#"{ "player": { "dash_interval_ms": 200 } }"#).unwrap_err();
        assert!(matches!(
            err,
            SetupError::InvalidSetting {
                name: "player.dash_interval_ms",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(Settings::from_json_str("{ nope"), Err(SetupError::Config(_))));
    }

    #[test]
    fn test_json_round_trip() {
        let mut s = Settings::default();
        s.world.mask_policy = MaskPolicy::Either;
        let back = Settings::from_json_str(&s.to_json().unwrap()).unwrap();
        assert_eq!(back.world.mask_policy, MaskPolicy::Either);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Settings::load("/definitely/not/here.json"),
            Err(SetupError::Io(_))
        ));
    }
}
