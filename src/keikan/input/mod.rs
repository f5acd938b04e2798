pub mod queue;

use std::fmt;
use std::time::Instant;

/// Abstract key codes. Printable keys are carried as lowercase characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Backspace,
    CapsLock,
    Delete,
    Down,
    End,
    Enter,
    Escape,
    F(u8),
    Home,
    Insert,
    Keypad(char),
    Left,
    LeftAlt,
    LeftControl,
    LeftShift,
    NumLock,
    PageDown,
    PageUp,
    Pause,
    Right,
    RightAlt,
    RightControl,
    RightShift,
    Space,
    Tab,
    Up,
}

/// Bit set of mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseButtons(pub u8);

impl MouseButtons {
    pub const NONE: MouseButtons = MouseButtons(0);
    pub const LEFT: MouseButtons = MouseButtons(1);
    pub const RIGHT: MouseButtons = MouseButtons(2);
    pub const MIDDLE: MouseButtons = MouseButtons(4);

    pub fn contains(self, other: MouseButtons) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: MouseButtons) -> MouseButtons {
        MouseButtons(self.0 | other.0)
    }

    pub fn without(self, other: MouseButtons) -> MouseButtons {
        MouseButtons(self.0 & !other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEventKind {
    MouseButtonPress { x: f32, y: f32, button: MouseButtons },
    MouseButtonRelease { x: f32, y: f32, button: MouseButtons },
    MouseMove { x: f32, y: f32, buttons: MouseButtons },
    KeyPress(Key),
    KeyRelease(Key),
}

impl fmt::Display for InputEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputEventKind::MouseButtonPress { .. } => "mouse button press",
            InputEventKind::MouseButtonRelease { .. } => "mouse button release",
            InputEventKind::MouseMove { .. } => "mouse move",
            InputEventKind::KeyPress(_) => "key press",
            InputEventKind::KeyRelease(_) => "key release",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputEvent {
    pub timestamp: Instant,
    pub kind: InputEventKind,
}

/// Entry points the platform layer calls from its event loop. Coordinates are
/// normalized to [-1, 1].
pub trait InputCallbacks {
    fn on_mouse_button_press(&self, x: f32, y: f32, button: MouseButtons);
    fn on_mouse_button_release(&self, x: f32, y: f32, button: MouseButtons);
    fn on_mouse_move(&self, x: f32, y: f32, buttons: MouseButtons);
    fn on_key_press(&self, key: Key);
    fn on_key_release(&self, key: Key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_set_operations() {
        let held = MouseButtons::NONE.with(MouseButtons::LEFT).with(MouseButtons::MIDDLE);
        assert_eq!(held, MouseButtons(5));
        assert!(held.contains(MouseButtons::LEFT));
        assert!(!held.contains(MouseButtons::RIGHT));
        assert_eq!(held.without(MouseButtons::LEFT), MouseButtons::MIDDLE);
    }

    #[test]
    fn event_kinds_name_themselves() {
        assert_eq!(InputEventKind::KeyPress(Key::Up).to_string(), "key press");
        let moved = InputEventKind::MouseMove {
            x: 0.0,
            y: 0.0,
            buttons: MouseButtons::NONE,
        };
        assert_eq!(moved.to_string(), "mouse move");
    }
}
