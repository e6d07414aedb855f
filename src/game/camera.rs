//! Camera: follows a world point and maps between screen and world space

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::render::RenderSurface;
use crate::sim::Bounds;

/// Visible world rectangle as edges
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Viewport {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn as_bounds(&self) -> Bounds {
        Bounds::new(self.left, self.top, self.width(), self.height())
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    /// World point at the center of the screen
    look_at: Vec2,
    /// Screen pixels per world unit
    zoom: f32,
    screen_size: Vec2,
}

impl Camera {
    pub fn new(screen_width: f32, screen_height: f32) -> Self {
        Self {
            look_at: Vec2::ZERO,
            zoom: 1.0,
            screen_size: Vec2::new(screen_width, screen_height),
        }
    }

    pub fn look_at(&self) -> Vec2 {
        self.look_at
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn screen_size(&self) -> Vec2 {
        self.screen_size
    }

    pub fn resize(&mut self, screen_width: f32, screen_height: f32) {
        self.screen_size = Vec2::new(screen_width, screen_height);
    }

    pub fn move_to(&mut self, position: Vec2) {
        self.look_at = position;
    }

    /// Zoom so that `view_width` world units span the screen width
    pub fn zoom_to(&mut self, view_width: f32) {
        if view_width > 0.0 && self.screen_size.x > 0.0 {
            self.zoom = self.screen_size.x / view_width;
        }
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.look_at) * self.zoom + self.screen_size / 2.0
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.screen_size / 2.0) / self.zoom + self.look_at
    }

    pub fn viewport(&self) -> Viewport {
        let half = self.screen_size / (2.0 * self.zoom);
        Viewport {
            top: self.look_at.y - half.y,
            bottom: self.look_at.y + half.y,
            left: self.look_at.x - half.x,
            right: self.look_at.x + half.x,
        }
    }

    /// Whether `position` is on screen, with `margin` world units of slack
    pub fn is_in_viewport(&self, position: Vec2, margin: f32) -> bool {
        let v = self.viewport();
        position.x >= v.left - margin
            && position.x <= v.right + margin
            && position.y >= v.top - margin
            && position.y <= v.bottom + margin
    }

    /// Push the world transform; pair with [`Camera::end`]
    pub fn begin(&self, surface: &mut dyn RenderSurface) {
        surface.save();
        surface.translate(self.screen_size / 2.0);
        surface.scale(self.zoom);
        surface.translate(-self.look_at);
    }

    pub fn end(&self, surface: &mut dyn RenderSurface) {
        surface.restore();
    }
}
