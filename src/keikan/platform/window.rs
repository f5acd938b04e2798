use crate::error::StartupError;
use crate::gpu::Extent;
use crate::input::{InputCallbacks, Key, MouseButtons};
use crate::platform::{PlatformSurface, WindowExtent};
use crate::shutdown::StopFlag;
use std::sync::Arc;
use std::time::{Duration, Instant};
use vulkano::instance::Instance;
use vulkano::swapchain::Surface;
use vulkano_win::VkSurfaceBuild;
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::run_return::EventLoopExtRunReturn;
use winit::window::{Fullscreen, Window, WindowBuilder};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

pub fn map_key(code: VirtualKeyCode) -> Option<Key> {
    use VirtualKeyCode::*;
    const LETTERS: [VirtualKeyCode; 26] = [
        A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    ];
    const DIGITS: [VirtualKeyCode; 10] = [Key0, Key1, Key2, Key3, Key4, Key5, Key6, Key7, Key8, Key9];
    const KEYPAD: [VirtualKeyCode; 10] = [
        Numpad0, Numpad1, Numpad2, Numpad3, Numpad4, Numpad5, Numpad6, Numpad7, Numpad8, Numpad9,
    ];
    const FUNCTION: [VirtualKeyCode; 12] = [F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12];

    if let Some(i) = LETTERS.iter().position(|k| *k == code) {
        return Some(Key::Char((b'a' + i as u8) as char));
    }
    if let Some(i) = DIGITS.iter().position(|k| *k == code) {
        return Some(Key::Char((b'0' + i as u8) as char));
    }
    if let Some(i) = KEYPAD.iter().position(|k| *k == code) {
        return Some(Key::Keypad((b'0' + i as u8) as char));
    }
    if let Some(i) = FUNCTION.iter().position(|k| *k == code) {
        return Some(Key::F(i as u8 + 1));
    }
    let key = match code {
        Back => Key::Backspace,
        Capital => Key::CapsLock,
        Delete => Key::Delete,
        Down => Key::Down,
        End => Key::End,
        Return => Key::Enter,
        Escape => Key::Escape,
        Home => Key::Home,
        Insert => Key::Insert,
        Left => Key::Left,
        LAlt => Key::LeftAlt,
        LControl => Key::LeftControl,
        LShift => Key::LeftShift,
        Numlock => Key::NumLock,
        PageDown => Key::PageDown,
        PageUp => Key::PageUp,
        Pause => Key::Pause,
        Right => Key::Right,
        RAlt => Key::RightAlt,
        RControl => Key::RightControl,
        RShift => Key::RightShift,
        Space => Key::Space,
        Tab => Key::Tab,
        Up => Key::Up,
        Minus => Key::Char('-'),
        Equals => Key::Char('='),
        Comma => Key::Char(','),
        Period => Key::Char('.'),
        Slash => Key::Char('/'),
        Semicolon => Key::Char(';'),
        Apostrophe => Key::Char('\''),
        LBracket => Key::Char('['),
        RBracket => Key::Char(']'),
        Backslash => Key::Char('\\'),
        Grave => Key::Char('`'),
        _ => return None,
    };
    Some(key)
}

pub fn map_button(button: MouseButton) -> Option<MouseButtons> {
    match button {
        MouseButton::Left => Some(MouseButtons::LEFT),
        MouseButton::Right => Some(MouseButtons::RIGHT),
        MouseButton::Middle => Some(MouseButtons::MIDDLE),
        MouseButton::Other(_) => None,
    }
}

/// Window pixel coordinates to [-1, 1] on both axes, y pointing down.
pub fn normalize_cursor(position: PhysicalPosition<f64>, size: PhysicalSize<u32>) -> (f32, f32) {
    let axis = |value: f64, length: u32| {
        if length == 0 {
            0.0
        } else {
            ((2.0 * value / f64::from(length)) - 1.0).max(-1.0).min(1.0) as f32
        }
    };
    (axis(position.x, size.width), axis(position.y, size.height))
}

/// winit window with a vulkano surface. winit picks X11 or Wayland at runtime.
pub struct WinitPlatform {
    event_loop: EventLoop<()>,
    surface: Arc<Surface<Window>>,
    extent: WindowExtent,
}

impl WinitPlatform {
    pub fn create(instance: &Arc<Instance>, settings: &WindowSettings) -> Result<Self, StartupError> {
        log::trace!("insance of {}", std::any::type_name::<Self>());
        let event_loop = EventLoop::new();
        let fullscreen = if settings.fullscreen {
            Some(Fullscreen::Borderless(None))
        } else {
            None
        };
        let surface = WindowBuilder::new()
            .with_title(settings.title.clone())
            .with_inner_size(LogicalSize::new(
                f64::from(settings.width),
                f64::from(settings.height),
            ))
            .with_fullscreen(fullscreen)
            .build_vk_surface(&event_loop, instance.clone())
            .map_err(|e| StartupError::Surface(e.to_string()))?;
        let size = surface.window().inner_size();
        let extent = WindowExtent::new(Extent::new(size.width, size.height));
        Ok(WinitPlatform {
            event_loop,
            surface,
            extent,
        })
    }

    pub fn surface(&self) -> Arc<Surface<Window>> {
        self.surface.clone()
    }
}

impl PlatformSurface for WinitPlatform {
    fn window_extent(&self) -> WindowExtent {
        self.extent.clone()
    }

    fn event_loop(&mut self, callbacks: &dyn InputCallbacks, exit: &StopFlag) {
        let extent = self.extent.clone();
        let mut size = self.surface.window().inner_size();
        let mut cursor = (0.0f32, 0.0f32);
        let mut buttons = MouseButtons::NONE;

        self.event_loop.run_return(|event, _, control_flow| {
            match event {
                Event::WindowEvent {
                    event: WindowEvent::CloseRequested,
                    ..
                } => {
                    log::info!("window closed");
                    exit.request();
                }
                Event::WindowEvent {
                    event: WindowEvent::Resized(new_size),
                    ..
                } => {
                    size = new_size;
                    extent.set(Extent::new(new_size.width, new_size.height));
                }
                Event::WindowEvent {
                    event:
                        WindowEvent::KeyboardInput {
                            input:
                                KeyboardInput {
                                    state,
                                    virtual_keycode: Some(code),
                                    ..
                                },
                            ..
                        },
                    ..
                } => {
                    if let Some(key) = map_key(code) {
                        match state {
                            ElementState::Pressed => callbacks.on_key_press(key),
                            ElementState::Released => callbacks.on_key_release(key),
                        }
                    }
                }
                Event::WindowEvent {
                    event: WindowEvent::CursorMoved { position, .. },
                    ..
                } => {
                    cursor = normalize_cursor(position, size);
                    callbacks.on_mouse_move(cursor.0, cursor.1, buttons);
                }
                Event::WindowEvent {
                    event: WindowEvent::MouseInput { state, button, .. },
                    ..
                } => {
                    if let Some(button) = map_button(button) {
                        match state {
                            ElementState::Pressed => {
                                buttons = buttons.with(button);
                                callbacks.on_mouse_button_press(cursor.0, cursor.1, button);
                            }
                            ElementState::Released => {
                                buttons = buttons.without(button);
                                callbacks.on_mouse_button_release(cursor.0, cursor.1, button);
                            }
                        }
                    }
                }
                _ => (),
            }

            *control_flow = if exit.is_requested() {
                ControlFlow::Exit
            } else {
                ControlFlow::WaitUntil(Instant::now() + EXIT_POLL_INTERVAL)
            };
        });
        log::debug!("event loop finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_abstract_codes() {
        assert_eq!(map_key(VirtualKeyCode::W), Some(Key::Char('w')));
        assert_eq!(map_key(VirtualKeyCode::Z), Some(Key::Char('z')));
        assert_eq!(map_key(VirtualKeyCode::Key7), Some(Key::Char('7')));
        assert_eq!(map_key(VirtualKeyCode::Numpad3), Some(Key::Keypad('3')));
        assert_eq!(map_key(VirtualKeyCode::F12), Some(Key::F(12)));
        assert_eq!(map_key(VirtualKeyCode::Escape), Some(Key::Escape));
        assert_eq!(map_key(VirtualKeyCode::Left), Some(Key::Left));
        assert_eq!(map_key(VirtualKeyCode::F20), None);
    }

    #[test]
    fn buttons_map_to_bits() {
        assert_eq!(map_button(MouseButton::Left), Some(MouseButtons(1)));
        assert_eq!(map_button(MouseButton::Right), Some(MouseButtons(2)));
        assert_eq!(map_button(MouseButton::Middle), Some(MouseButtons(4)));
        assert_eq!(map_button(MouseButton::Other(9)), None);
    }

    #[test]
    fn cursor_is_normalized_and_clamped() {
        let size = PhysicalSize::new(400, 200);
        assert_eq!(normalize_cursor(PhysicalPosition::new(0.0, 0.0), size), (-1.0, -1.0));
        assert_eq!(normalize_cursor(PhysicalPosition::new(200.0, 100.0), size), (0.0, 0.0));
        assert_eq!(normalize_cursor(PhysicalPosition::new(400.0, 200.0), size), (1.0, 1.0));
        assert_eq!(normalize_cursor(PhysicalPosition::new(-50.0, 900.0), size), (-1.0, 1.0));
        assert_eq!(
            normalize_cursor(PhysicalPosition::new(5.0, 5.0), PhysicalSize::new(0, 0)),
            (0.0, 0.0)
        );
    }
}
