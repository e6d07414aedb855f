//! Pieces every entity shares: ids, health, the common interface

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::render::RenderSurface;
use crate::error::EntityError;
use crate::sim::{Collider, ColliderId, ColliderWorld};

/// Stable entity handle, unique within one world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Which entity list a collider belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Player,
    Seeker(EntityId),
    Bullet(EntityId),
    Grenade(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    /// Subtract `amount`, never going below zero. Returns true if this hit was fatal.
    pub fn damage(&mut self, amount: f32) -> bool {
        let was_alive = !self.is_dead();
        self.current = (self.current - amount.max(0.0)).max(0.0);
        was_alive && self.is_dead()
    }

    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount.max(0.0)).min(self.max);
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 { self.current / self.max } else { 0.0 }
    }
}

pub(crate) fn collider_of(colliders: &ColliderWorld, id: ColliderId) -> Result<&Collider, EntityError> {
    colliders.get(id).ok_or(EntityError::MissingCollider(id))
}

pub(crate) fn collider_mut(colliders: &mut ColliderWorld, id: ColliderId) -> Result<&mut Collider, EntityError> {
    colliders.get_mut(id).ok_or(EntityError::MissingCollider(id))
}

/// Operations shared by everything that lives in the world.
///
/// Position always comes from the entity's collider.
pub trait Entity {
    fn id(&self) -> EntityId;

    fn collider(&self) -> ColliderId;

    fn position(&self, colliders: &ColliderWorld) -> Result<Vec2, EntityError> {
        collider_of(colliders, self.collider()).map(|c| c.position)
    }

    /// Position pushed forward by `alpha` of a step along the current velocity
    fn render_position(&self, colliders: &ColliderWorld, alpha: f32, step: f32) -> Result<Vec2, EntityError> {
        collider_of(colliders, self.collider()).map(|c| c.position + c.velocity * step * alpha)
    }

    fn render(
        &self,
        colliders: &ColliderWorld,
        surface: &mut dyn RenderSurface,
        alpha: f32,
        step: f32,
    ) -> Result<(), EntityError>;

    /// Unregister the collider. The world drops the entity from its list.
    fn dispose(&self, colliders: &mut ColliderWorld) {
        colliders.remove(self.collider());
    }
}
