//! Collider bodies: shape, kinematic state, mass and collision filtering

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bounds::Bounds;
use super::vector::VectorExt;

/// Stable collider handle. Ids are never reused within one collider world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId(pub u32);

/// Collision group tag. Each collider belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollisionGroup {
    MapBounds,
    MapTiles,
    Player,
    Zombies,
    Projectiles,
    Mobs,
}

impl CollisionGroup {
    pub const ALL: [CollisionGroup; 6] = [
        CollisionGroup::MapBounds,
        CollisionGroup::MapTiles,
        CollisionGroup::Player,
        CollisionGroup::Zombies,
        CollisionGroup::Projectiles,
        CollisionGroup::Mobs,
    ];

    #[inline]
    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Set of collision groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupMask(u8);

impl GroupMask {
    pub const NONE: GroupMask = GroupMask(0);
    pub const ALL: GroupMask = GroupMask(0b11_1111);

    pub fn of(groups: &[CollisionGroup]) -> Self {
        groups.iter().fold(Self::NONE, |m, g| m.with(*g))
    }

    #[must_use]
    pub const fn with(self, group: CollisionGroup) -> Self {
        GroupMask(self.0 | group.bit())
    }

    #[must_use]
    pub const fn without(self, group: CollisionGroup) -> Self {
        GroupMask(self.0 & !group.bit())
    }

    #[inline]
    pub const fn contains(self, group: CollisionGroup) -> bool {
        self.0 & group.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Collider geometry. Polygon vertices are in local space around `position`
/// and assumed convex; orientation is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    Polygon { vertices: Vec<Vec2> },
}

impl Shape {
    /// Axis-aligned rectangle polygon centered on the local origin
    pub fn rect(width: f32, height: f32) -> Self {
        let hw = width / 2.0;
        let hh = height / 2.0;
        Shape::Polygon {
            vertices: vec![
                Vec2::new(-hw, -hh),
                Vec2::new(hw, -hh),
                Vec2::new(hw, hh),
                Vec2::new(-hw, hh),
            ],
        }
    }

    /// AABB when placed at `position`
    pub fn aabb_at(&self, position: Vec2) -> Bounds {
        match self {
            Shape::Circle { radius } => Bounds::new(
                position.x - radius,
                position.y - radius,
                radius * 2.0,
                radius * 2.0,
            ),
            Shape::Polygon { vertices } => {
                Bounds::from_points(vertices.iter().map(|v| *v + position))
            }
        }
    }

    /// Exact overlap test against an AABB when placed at `position`
    pub fn intersects_bounds(&self, position: Vec2, bounds: &Bounds) -> bool {
        super::collision::shape_intersects_bounds(self, position, bounds)
    }

    /// Smallest half-extent, used to size substeps
    pub fn min_extent(&self) -> f32 {
        match self {
            Shape::Circle { radius } => *radius,
            Shape::Polygon { .. } => {
                let b = self.aabb_at(Vec2::ZERO);
                b.w.min(b.h) / 2.0
            }
        }
    }
}

/// A rigid body that only translates
#[derive(Debug, Clone)]
pub struct Collider {
    pub(crate) id: ColliderId,
    pub shape: Shape,
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,
    mass: f32,
    /// Fraction of velocity lost per tick, in [0, 1)
    pub friction: f32,
    is_static: bool,
    /// Reports contacts but is never pushed or pushes others
    pub sensor: bool,
    pub group: CollisionGroup,
    pub mask: GroupMask,
}

impl Collider {
    pub fn circle(radius: f32) -> Self {
        Self::with_shape(Shape::Circle { radius })
    }

    pub fn polygon(vertices: Vec<Vec2>) -> Self {
        Self::with_shape(Shape::Polygon { vertices })
    }

    pub fn with_shape(shape: Shape) -> Self {
        Self {
            id: ColliderId(0),
            shape,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            mass: 1.0,
            friction: 0.0,
            is_static: false,
            sensor: false,
            group: CollisionGroup::Mobs,
            mask: GroupMask::NONE,
        }
    }

    /// Builder: place at `position`
    #[must_use]
    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Builder: set mass (see [`Collider::set_mass`])
    #[must_use]
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.set_mass(mass);
        self
    }

    /// Builder: set group and mask
    #[must_use]
    pub fn in_group(mut self, group: CollisionGroup, mask: GroupMask) -> Self {
        self.group = group;
        self.mask = mask;
        self
    }

    /// Builder: mark as static (immovable, infinite mass)
    #[must_use]
    pub fn into_static(mut self) -> Self {
        self.set_static(true);
        self
    }

    pub fn id(&self) -> ColliderId {
        self.id
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Mass must be positive; `f32::INFINITY` marks an immovable body.
    /// Non-positive or NaN input is ignored with a warning.
    pub fn set_mass(&mut self, mass: f32) {
        if mass > 0.0 {
            self.mass = mass;
        } else {
            log::warn!("collider {:?}: rejecting non-positive mass {}", self.id, mass);
        }
    }

    /// Zero for immovable or static bodies
    pub fn inverse_mass(&self) -> f32 {
        if self.is_static || self.sensor || !self.mass.is_finite() {
            0.0
        } else {
            1.0 / self.mass
        }
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Static bodies never integrate; their velocity is pinned to zero
    pub fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
        if is_static {
            self.velocity = Vec2::ZERO;
            self.acceleration = Vec2::ZERO;
            self.mass = f32::INFINITY;
        }
    }

    /// `acceleration += force / mass`
    pub fn apply_force(&mut self, force: Vec2) {
        if self.is_static || !self.mass.is_finite() {
            return;
        }
        self.acceleration += force / self.mass;
    }

    pub fn apply_force_x(&mut self, fx: f32) {
        self.apply_force(Vec2::new(fx, 0.0));
    }

    pub fn apply_force_y(&mut self, fy: f32) {
        self.apply_force(Vec2::new(0.0, fy));
    }

    /// Clamp accumulated acceleration magnitude
    pub fn limit_acceleration(&mut self, max: f32) {
        self.acceleration = self.acceleration.limit(max);
    }

    pub fn aabb(&self) -> Bounds {
        self.shape.aabb_at(self.position)
    }

    /// Polygon vertices in world space (empty for circles)
    pub fn world_vertices(&self) -> Vec<Vec2> {
        match &self.shape {
            Shape::Circle { .. } => Vec::new(),
            Shape::Polygon { vertices } => vertices.iter().map(|v| *v + self.position).collect(),
        }
    }

    pub fn width(&self) -> f32 {
        self.aabb().w
    }

    pub fn height(&self) -> f32 {
        self.aabb().h
    }

    /// Whether `self` accepts contacts from `other`'s group
    #[inline]
    pub fn accepts(&self, other: &Collider) -> bool {
        self.mask.contains(other.group)
    }
}
