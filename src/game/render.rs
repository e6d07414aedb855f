//! Draw surface abstraction
//!
//! The simulation only issues draw calls; whatever embeds it decides how to
//! put pixels on screen. [`DrawRecorder`] keeps the calls in a list, which is
//! what the headless binary and the tests use.

use glam::Vec2;

use crate::sim::Bounds;

/// RGBA, each channel in [0, 1]
pub type Color = [f32; 4];

pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];
pub const FPS_GREEN: Color = [0.0, 1.0, 0.0, 1.0];

/// 2D drawing context with a transform stack
pub trait RenderSurface {
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, offset: Vec2);
    fn rotate(&mut self, radians: f32);
    fn scale(&mut self, factor: f32);
    /// Draw `source` (sprite-sheet region, or the whole image) into `dest`
    fn draw_image(&mut self, image: &str, source: Option<Bounds>, dest: Bounds);
    fn fill_rect(&mut self, rect: Bounds, color: Color);
    fn fill_text(&mut self, text: &str, position: Vec2, color: Color);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    Translate(Vec2),
    Rotate(f32),
    Scale(f32),
    Image {
        image: String,
        source: Option<Bounds>,
        dest: Bounds,
    },
    Rect {
        rect: Bounds,
        color: Color,
    },
    Text {
        text: String,
        position: Vec2,
        color: Color,
    },
}

/// Surface that records every call
#[derive(Debug, Clone, Default)]
pub struct DrawRecorder {
    commands: Vec<DrawCommand>,
}

impl DrawRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Names of drawn images, in draw order
    pub fn images(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Image { image, .. } => Some(image.as_str()),
            _ => None,
        })
    }
}

impl RenderSurface for DrawRecorder {
    fn save(&mut self) {
        self.commands.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.commands.push(DrawCommand::Restore);
    }

    fn translate(&mut self, offset: Vec2) {
        self.commands.push(DrawCommand::Translate(offset));
    }

    fn rotate(&mut self, radians: f32) {
        self.commands.push(DrawCommand::Rotate(radians));
    }

    fn scale(&mut self, factor: f32) {
        self.commands.push(DrawCommand::Scale(factor));
    }

    fn draw_image(&mut self, image: &str, source: Option<Bounds>, dest: Bounds) {
        self.commands.push(DrawCommand::Image {
            image: image.to_string(),
            source,
            dest,
        });
    }

    fn fill_rect(&mut self, rect: Bounds, color: Color) {
        self.commands.push(DrawCommand::Rect { rect, color });
    }

    fn fill_text(&mut self, text: &str, position: Vec2, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            position,
            color,
        });
    }
}
