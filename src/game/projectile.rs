//! Bullets, grenades and the explosions grenades leave behind

use std::collections::HashSet;

use glam::Vec2;

use super::entity::{Entity, EntityId, collider_mut, collider_of};
use super::render::RenderSurface;
use crate::error::EntityError;
use crate::settings::{BulletSettings, GrenadeSettings};
use crate::sim::{Bounds, Collider, ColliderId, ColliderWorld, CollisionGroup, GroupMask, from_angle};

const EXPLOSION_FRAMES: u32 = 8;

fn projectile_mask() -> GroupMask {
    GroupMask::of(&[CollisionGroup::MapBounds, CollisionGroup::MapTiles, CollisionGroup::Zombies])
}

/// Straight-line sensor shot
#[derive(Debug, Clone)]
pub struct Bullet {
    id: EntityId,
    collider: ColliderId,
    origin: Vec2,
    angle: f32,
    damage: f32,
    max_distance: f32,
    hits_left: u32,
    marked: HashSet<EntityId>,
    spent: bool,
}

impl Bullet {
    pub fn spawn(id: EntityId, settings: &BulletSettings, colliders: &mut ColliderWorld, origin: Vec2, angle: f32) -> Self {
        let mut collider = Collider::circle(settings.radius)
            .at(origin)
            .in_group(CollisionGroup::Projectiles, projectile_mask());
        collider.sensor = true;
        collider.velocity = from_angle(angle) * settings.speed;
        let collider = colliders.add(collider);

        Self {
            id,
            collider,
            origin,
            angle,
            damage: settings.damage,
            max_distance: settings.max_distance,
            hits_left: settings.penetration.max(1),
            marked: HashSet::new(),
            spent: false,
        }
    }

    pub fn origin(&self) -> Vec2 {
        self.origin
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }

    /// Damage to deal to `victim`, once per victim and only while hits remain
    pub fn hit(&mut self, victim: EntityId) -> Option<f32> {
        if self.spent || !self.marked.insert(victim) {
            return None;
        }
        self.hits_left = self.hits_left.saturating_sub(1);
        if self.hits_left == 0 {
            self.spent = true;
        }
        Some(self.damage)
    }

    /// Map geometry stops the bullet outright
    pub fn hit_wall(&mut self) {
        self.spent = true;
    }

    /// Mark spent once past its range. Returns whether it is still live.
    pub fn update(&mut self, colliders: &ColliderWorld) -> Result<bool, EntityError> {
        let pos = collider_of(colliders, self.collider)?.position;
        if pos.distance(self.origin) > self.max_distance {
            self.spent = true;
        }
        Ok(!self.spent)
    }
}

impl Entity for Bullet {
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
        let pos = self.render_position(colliders, alpha, step)?;
        surface.save();
        surface.translate(pos);
        surface.rotate(self.angle);
        surface.draw_image("bullet", None, Bounds::new(-3.0, -1.0, 6.0, 2.0));
        surface.restore();
        Ok(())
    }
}

/// Thrown charge that slows down, then blows up
#[derive(Debug, Clone)]
pub struct Grenade {
    id: EntityId,
    collider: ColliderId,
    angle: f32,
    thrust: f32,
    decay: f32,
    detonate_at_ms: f64,
    aoe: f32,
    knockback: f32,
    damage: f32,
    marked: HashSet<EntityId>,
    detonated: bool,
}

impl Grenade {
    pub fn spawn(
        id: EntityId,
        settings: &GrenadeSettings,
        colliders: &mut ColliderWorld,
        origin: Vec2,
        angle: f32,
        now_ms: f64,
    ) -> Self {
        let mut collider = Collider::circle(settings.radius)
            .at(origin)
            .with_mass(settings.mass)
            .in_group(CollisionGroup::Projectiles, projectile_mask());
        collider.friction = settings.friction;
        let collider = colliders.add(collider);

        Self {
            id,
            collider,
            angle,
            thrust: settings.speed,
            decay: settings.decay,
            detonate_at_ms: now_ms + settings.detonation_ms,
            aoe: settings.aoe,
            knockback: settings.knockback,
            damage: settings.damage,
            marked: HashSet::new(),
            detonated: false,
        }
    }

    pub fn damage(&self) -> f32 {
        self.damage
    }

    pub fn aoe(&self) -> f32 {
        self.aoe
    }

    pub fn is_detonated(&self) -> bool {
        self.detonated
    }

    pub fn should_detonate(&self, now_ms: f64) -> bool {
        !self.detonated && now_ms >= self.detonate_at_ms
    }

    /// Push along the throw direction; thrust decays every tick
    pub fn fixed_update(&mut self, colliders: &mut ColliderWorld) -> Result<(), EntityError> {
        let collider = collider_mut(colliders, self.collider)?;
        let force = from_angle(self.angle) * self.thrust * collider.mass();
        collider.apply_force(force);
        self.thrust *= self.decay;
        Ok(())
    }

    /// Knock back every dynamic body in the blast and return the colliders
    /// caught in it. Returns the blast center with them.
    pub fn detonate(&mut self, colliders: &mut ColliderWorld) -> Result<(Vec2, Vec<ColliderId>), EntityError> {
        let center = collider_of(colliders, self.collider)?.position;
        self.detonated = true;

        let mut caught = Vec::new();
        for id in colliders.query_circle(center, self.aoe) {
            if id == self.collider {
                continue;
            }
            let Some(body) = colliders.get(id) else {
                continue;
            };
            let offset = body.position - center;
            let distance = offset.length();
            if distance >= self.aoe {
                continue;
            }
            caught.push(id);
            if body.is_static() {
                continue;
            }

            let direction = if distance > f32::EPSILON {
                offset / distance
            } else {
                from_angle(self.angle)
            };
            if let Some(body) = colliders.get_mut(id) {
                let force = direction * (self.aoe - distance) * self.knockback * body.mass();
                body.apply_force(force);
            }
        }
        Ok((center, caught))
    }

    /// Record `victim`; false if the blast already hit it
    pub fn mark(&mut self, victim: EntityId) -> bool {
        self.marked.insert(victim)
    }
}

impl Entity for Grenade {
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
        let pos = self.render_position(colliders, alpha, step)?;
        let r = collider_of(colliders, self.collider)?.width() / 2.0;
        surface.draw_image("grenade", None, Bounds::from_center(pos, Vec2::splat(r * 2.0)));
        Ok(())
    }
}

/// Overlay sprite with a fixed lifetime
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Explosion {
    position: Vec2,
    radius: f32,
    started_ms: f64,
    lifetime_ms: f64,
}

impl Explosion {
    pub fn new(position: Vec2, radius: f32, started_ms: f64, lifetime_ms: f64) -> Self {
        Self {
            position,
            radius,
            started_ms,
            lifetime_ms,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        now_ms - self.started_ms >= self.lifetime_ms
    }

    /// Animation frame for `now_ms`
    pub fn frame(&self, now_ms: f64) -> u32 {
        if self.lifetime_ms <= 0.0 {
            return EXPLOSION_FRAMES - 1;
        }
        let progress = ((now_ms - self.started_ms) / self.lifetime_ms).clamp(0.0, 1.0);
        ((progress * EXPLOSION_FRAMES as f64) as u32).min(EXPLOSION_FRAMES - 1)
    }

    pub fn render(&self, surface: &mut dyn RenderSurface, now_ms: f64) {
        let size = self.radius * 2.0;
        let source = Bounds::new(self.frame(now_ms) as f32 * 64.0, 0.0, 64.0, 64.0);
        surface.draw_image("explosion", Some(source), Bounds::from_center(self.position, Vec2::splat(size)));
    }
}
