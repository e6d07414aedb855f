//! 2D vector helpers on top of `glam::Vec2`
//!
//! glam already covers add/sub/scale/dot/length/distance/lerp. This adds the
//! handful of game-specific operations the simulation leans on: headings,
//! acceleration clamping and per-axis interpolation.

use glam::Vec2;

/// Extra operations used by the collider world and entities
pub trait VectorExt {
    /// Angle of the vector itself, `atan2(y, x)`
    fn heading(self) -> f32;
    /// Angle of the line from `self` toward `target`
    fn angle_to(self, target: Vec2) -> f32;
    /// Clamp the magnitude to at most `max`
    fn limit(self, max: f32) -> Vec2;
    /// Same direction, new length. Zero vectors stay zero.
    fn with_magnitude(self, magnitude: f32) -> Vec2;
    /// Interpolate toward `target` with independent x/y weights
    fn lerp_xy(self, target: Vec2, weight_x: f32, weight_y: f32) -> Vec2;
}

impl VectorExt for Vec2 {
    #[inline]
    fn heading(self) -> f32 {
        self.y.atan2(self.x)
    }

    #[inline]
    fn angle_to(self, target: Vec2) -> f32 {
        (target - self).heading()
    }

    fn limit(self, max: f32) -> Vec2 {
        let len_sq = self.length_squared();
        if len_sq > max * max && len_sq > 0.0 {
            self * (max / len_sq.sqrt())
        } else {
            self
        }
    }

    fn with_magnitude(self, magnitude: f32) -> Vec2 {
        self.normalize_or_zero() * magnitude
    }

    #[inline]
    fn lerp_xy(self, target: Vec2, weight_x: f32, weight_y: f32) -> Vec2 {
        Vec2::new(
            weight_x * (target.x - self.x) + self.x,
            weight_y * (target.y - self.y) + self.y,
        )
    }
}

/// Unit vector pointing along `angle` (radians)
#[inline]
pub fn from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
