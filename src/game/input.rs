//! Input snapshot consumed once per frame

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Logical controls, independent of key bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Dash,
    ShowWeapons,
    PauseGame,
}

impl Control {
    pub const ALL: [Control; 7] = [
        Control::MoveUp,
        Control::MoveDown,
        Control::MoveLeft,
        Control::MoveRight,
        Control::Dash,
        Control::ShowWeapons,
        Control::PauseGame,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouseState {
    /// Screen-space position
    pub position: Vec2,
    pub left_pressed: bool,
}

/// Pressed state of every control plus the mouse
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pressed: [bool; Control::ALL.len()],
    pub mouse: MouseState,
}

impl InputSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: mark `control` pressed
    #[must_use]
    pub fn with(mut self, control: Control) -> Self {
        self.set(control, true);
        self
    }

    /// Builder: mouse at `position` (screen space)
    #[must_use]
    pub fn with_mouse(mut self, position: Vec2, left_pressed: bool) -> Self {
        self.mouse = MouseState {
            position,
            left_pressed,
        };
        self
    }

    pub fn set(&mut self, control: Control, pressed: bool) {
        self.pressed[control as usize] = pressed;
    }

    #[inline]
    pub fn is_pressed(&self, control: Control) -> bool {
        self.pressed[control as usize]
    }

    /// Pressed now but not in `previous`
    pub fn just_pressed(&self, previous: &InputSnapshot, control: Control) -> bool {
        self.is_pressed(control) && !previous.is_pressed(control)
    }

    pub fn any_movement(&self) -> bool {
        [Control::MoveUp, Control::MoveDown, Control::MoveLeft, Control::MoveRight]
            .iter()
            .any(|c| self.is_pressed(*c))
    }
}
