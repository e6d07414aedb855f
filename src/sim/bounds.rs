//! Axis-aligned bounding boxes
//!
//! `(x, y)` is the top-left corner, `w`/`h` extend toward +x/+y.

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Box of size `size` centered on `center`
    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self::new(center.x - size.x / 2.0, center.y - size.y / 2.0, size.x, size.y)
    }

    /// Smallest box holding every point. Empty input yields a zero box at the origin.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.right(), self.bottom())
    }

    /// Standard AABB overlap; touching edges do not count
    #[inline]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// True if `other` lies entirely inside `self` (edges inclusive)
    #[inline]
    pub fn contains(&self, other: &Bounds) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Smallest box covering both
    pub fn union(&self, other: &Bounds) -> Bounds {
        let min = self.min().min(other.min());
        let max = self.max().max(other.max());
        Bounds::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }

    /// Grow (or shrink, with a negative amount) every side by `amount`
    pub fn inflate(&self, amount: f32) -> Bounds {
        Bounds::new(
            self.x - amount,
            self.y - amount,
            self.w + amount * 2.0,
            self.h + amount * 2.0,
        )
    }

    /// Move the box by `delta`
    pub fn translate(&self, delta: Vec2) -> Bounds {
        Bounds::new(self.x + delta.x, self.y + delta.y, self.w, self.h)
    }

    /// The four corners, clockwise from top-left
    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.right(), self.y),
            Vec2::new(self.right(), self.bottom()),
            Vec2::new(self.x, self.bottom()),
        ]
    }

    /// Split into four equal quadrants: NW, NE, SW, SE
    pub fn quadrants(&self) -> [Bounds; 4] {
        let hw = self.w / 2.0;
        let hh = self.h / 2.0;
        [
            Bounds::new(self.x, self.y, hw, hh),
            Bounds::new(self.x + hw, self.y, hw, hh),
            Bounds::new(self.x, self.y + hh, hw, hh),
            Bounds::new(self.x + hw, self.y + hh, hw, hh),
        ]
    }
}
