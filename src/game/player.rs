//! The player: WASD movement, cooldown-gated dash and shooting

use glam::Vec2;

use super::entity::{Entity, EntityId, Health, collider_mut, collider_of};
use super::input::{Control, InputSnapshot};
use super::render::RenderSurface;
use crate::error::EntityError;
use crate::settings::PlayerSettings;
use crate::sim::{
    Bounds, Collider, ColliderId, ColliderWorld, CollisionGroup, GroupMask, IntervalMap, VectorExt,
    from_angle,
};

const DASH_TRAIL_MS: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Cooldown {
    Shoot,
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weapon {
    #[default]
    Pistol,
    GrenadeLauncher,
}

/// A projectile the world should spawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotRequest {
    pub weapon: Weapon,
    pub origin: Vec2,
    pub angle: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Controls {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    dash: bool,
    shoot: bool,
}

impl Controls {
    fn horizontal(&self) -> bool {
        self.left || self.right
    }

    fn vertical(&self) -> bool {
        self.up || self.down
    }

    fn any(&self) -> bool {
        self.horizontal() || self.vertical()
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    id: EntityId,
    collider: ColliderId,
    settings: PlayerSettings,
    health: Health,
    controls: Controls,
    aim_angle: f32,
    facing_left: bool,
    render_position: Vec2,
    dash_angle: f32,
    last_dash_ms: Option<f64>,
    dash_trail: bool,
    cooldowns: IntervalMap<Cooldown>,
    weapon: Weapon,
}

impl Player {
    pub fn spawn(id: EntityId, settings: &PlayerSettings, colliders: &mut ColliderWorld, position: Vec2) -> Self {
        let mut collider = Collider::circle(settings.radius)
            .at(position)
            .with_mass(settings.mass)
            .in_group(
                CollisionGroup::Player,
                GroupMask::of(&[CollisionGroup::MapBounds, CollisionGroup::MapTiles, CollisionGroup::Zombies]),
            );
        collider.friction = settings.friction;
        let collider = colliders.add(collider);

        let mut cooldowns = IntervalMap::new();
        cooldowns.register(Cooldown::Shoot, settings.shoot_interval_ms);
        cooldowns.register(Cooldown::Dash, settings.dash_interval_ms);

        Self {
            id,
            collider,
            settings: settings.clone(),
            health: Health::new(settings.max_health),
            controls: Controls::default(),
            aim_angle: 0.0,
            facing_left: false,
            render_position: position - Vec2::new(0.0, settings.radius),
            dash_angle: 0.0,
            last_dash_ms: None,
            dash_trail: false,
            cooldowns,
            weapon: Weapon::default(),
        }
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    pub fn is_dead(&self) -> bool {
        self.health.is_dead()
    }

    pub fn aim_angle(&self) -> f32 {
        self.aim_angle
    }

    pub fn is_facing_left(&self) -> bool {
        self.facing_left
    }

    pub fn weapon(&self) -> Weapon {
        self.weapon
    }

    pub fn set_weapon(&mut self, weapon: Weapon) {
        self.weapon = weapon;
    }

    /// Where sprites are anchored: the collider center lifted by the radius
    pub fn render_anchor(&self) -> Vec2 {
        self.render_position
    }

    /// Latch controls and aim at `mouse_world`
    pub fn apply_input(&mut self, input: &InputSnapshot, mouse_world: Vec2) {
        self.controls = Controls {
            up: input.is_pressed(Control::MoveUp),
            down: input.is_pressed(Control::MoveDown),
            left: input.is_pressed(Control::MoveLeft),
            right: input.is_pressed(Control::MoveRight),
            dash: input.is_pressed(Control::Dash),
            shoot: input.mouse.left_pressed,
        };
        self.aim_angle = self.render_position.angle_to(mouse_world);
        self.facing_left = self.aim_angle.abs() > std::f32::consts::FRAC_PI_2;
    }

    /// Movement forces and dash for one fixed tick
    pub fn fixed_update(&mut self, colliders: &mut ColliderWorld, now_ms: f64) -> Result<(), EntityError> {
        let collider = collider_mut(colliders, self.collider)?;
        self.render_position = collider.position - Vec2::new(0.0, self.settings.radius);

        let force = self.settings.speed * collider.mass();
        let c = self.controls;
        if c.left {
            collider.apply_force_x(-force);
        }
        if c.right {
            collider.apply_force_x(force);
        }
        if c.up {
            collider.apply_force_y(-force);
        }
        if c.down {
            collider.apply_force_y(force);
        }
        if c.horizontal() && c.vertical() {
            collider.limit_acceleration(self.settings.speed);
        }

        if c.dash && self.cooldowns.is_over(&Cooldown::Dash, now_ms) {
            self.dash(collider);
            self.cooldowns.reset(&Cooldown::Dash, now_ms);
            self.last_dash_ms = Some(now_ms);
        }
        Ok(())
    }

    fn dash(&mut self, collider: &mut Collider) {
        let force = self.settings.dash_speed * collider.mass();
        let c = self.controls;

        if c.up {
            collider.apply_force_y(-force);
        } else if c.down {
            collider.apply_force_y(force);
        }
        if c.left {
            collider.apply_force_x(-force);
        } else if c.right {
            collider.apply_force_x(force);
        }
        if c.horizontal() && c.vertical() {
            collider.limit_acceleration(self.settings.dash_speed);
        }

        // Standing still: dash away from the cursor
        if !c.any() {
            collider.apply_force(from_angle(std::f32::consts::PI + self.aim_angle) * force);
        }

        self.dash_angle = collider.acceleration.heading();
    }

    /// Variable-rate part: sync the render anchor and fire if allowed
    pub fn update(&mut self, colliders: &ColliderWorld, now_ms: f64) -> Result<Option<ShotRequest>, EntityError> {
        let collider = collider_of(colliders, self.collider)?;
        self.render_position = collider.position - Vec2::new(0.0, self.settings.radius);
        self.dash_trail = self
            .last_dash_ms
            .is_some_and(|at| now_ms - at < DASH_TRAIL_MS);

        if !self.controls.shoot || !self.cooldowns.try_fire(&Cooldown::Shoot, now_ms) {
            return Ok(None);
        }
        Ok(Some(ShotRequest {
            weapon: self.weapon,
            origin: self.render_position + from_angle(self.aim_angle) * self.settings.shoot_offset,
            angle: self.aim_angle,
        }))
    }
}

impl Entity for Player {
    fn id(&self) -> EntityId {
        self.id
    }

    fn collider(&self) -> ColliderId {
        self.collider
    }

    fn render(
        &self,
        colliders: &ColliderWorld,
        surface: &mut dyn RenderSurface,
        alpha: f32,
        step: f32,
    ) -> Result<(), EntityError> {
        let pos = self.render_position(colliders, alpha, step)? - Vec2::new(0.0, self.settings.radius);
        let size = self.settings.radius * 4.0;

        if self.dash_trail {
            surface.save();
            surface.translate(pos);
            surface.rotate(self.dash_angle - std::f32::consts::FRAC_PI_2);
            surface.draw_image("dash", None, Bounds::new(-size / 2.0, 0.0, size, size));
            surface.restore();
        }

        let body = if self.facing_left { "player_left" } else { "player" };
        surface.draw_image(body, None, Bounds::from_center(pos, Vec2::splat(size)));

        surface.save();
        surface.translate(pos);
        surface.rotate(self.aim_angle);
        surface.draw_image("gun", None, Bounds::new(size / 2.0, -size / 4.0, size / 2.0, size / 2.0));
        surface.restore();
        Ok(())
    }
}
