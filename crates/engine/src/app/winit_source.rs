use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::PhysicalKey;

use super::events::PlatformEvent;

/// Turns winit window events into platform events.
///
/// winit only reports absolute cursor positions, so relative motion is derived
/// from the previous position seen while the cursor stayed in the window.
#[derive(Debug, Default)]
pub struct WinitTranslator {
    last_cursor: Option<[i32; 2]>,
}

impl WinitTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(&mut self, event: &WindowEvent) -> Option<PlatformEvent> {
        match event {
            WindowEvent::CloseRequested => Some(PlatformEvent::Quit),
            WindowEvent::CursorMoved { position, .. } => {
                Some(self.cursor_moved(position.x.round() as i32, position.y.round() as i32))
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor_left();
                None
            }
            WindowEvent::MouseInput { state, button, .. } => {
                Some(translate_mouse_button(*button, *state))
            }
            WindowEvent::KeyboardInput { event, .. } => {
                translate_key(event.physical_key, event.state)
            }
            _ => None,
        }
    }

    fn cursor_moved(&mut self, x: i32, y: i32) -> PlatformEvent {
        let [dx, dy] = match self.last_cursor {
            Some([last_x, last_y]) => [x - last_x, y - last_y],
            None => [0, 0],
        };
        self.last_cursor = Some([x, y]);
        PlatformEvent::PointerMotion { x, y, dx, dy }
    }

    fn cursor_left(&mut self) {
        self.last_cursor = None;
    }
}

fn translate_key(key: PhysicalKey, state: ElementState) -> Option<PlatformEvent> {
    match key {
        PhysicalKey::Code(key) => Some(PlatformEvent::Key {
            key,
            pressed: state == ElementState::Pressed,
        }),
        PhysicalKey::Unidentified(_) => None,
    }
}

fn translate_mouse_button(button: MouseButton, state: ElementState) -> PlatformEvent {
    PlatformEvent::PointerButton {
        button,
        pressed: state == ElementState::Pressed,
    }
}
