use tracing::{debug, info, warn};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use super::events::{hat, DeviceIndex, EventSource, PlatformEvent};
use super::input::{InputRegistry, ToggleState};
use super::joystick::{Joystick, JoystickArena};

/// Per-frame input view.
///
/// Call [`EventSystem::process_events`] once per frame: it ages every toggle
/// and then applies the drained events, so each transition is visible for
/// exactly one frame.
#[derive(Debug, Default)]
pub struct EventSystem {
    keys: InputRegistry<KeyCode>,
    mouse_buttons: InputRegistry<MouseButton>,
    joysticks: JoystickArena,
    mouse_position: [i32; 2],
    mouse_relative: [i32; 2],
    quit_requested: bool,
}

impl EventSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens every device the source enumerates. Devices are fixed afterwards.
    pub fn init(&mut self, source: &impl EventSource) {
        let devices = source.devices();
        self.joysticks = JoystickArena::from_devices(&devices);

        let count = self.joysticks.len();
        info!(count, "joysticks_found");
        for joystick in self.joysticks.iter() {
            info!(
                index = joystick.index().0,
                name = joystick.name(),
                axes = joystick.axis_count(),
                buttons = joystick.button_count(),
                hats = joystick.hat_count(),
                "joystick_opened"
            );
        }
    }

    pub fn age_toggles(&mut self) {
        self.keys.age_all();
        self.mouse_buttons.age_all();
        for joystick in self.joysticks.iter_mut() {
            joystick.age_toggles();
        }
    }

    pub fn process_events(&mut self, source: &mut impl EventSource) {
        self.age_toggles();
        while let Some(event) = source.poll_event() {
            self.apply_event(event);
        }
    }

    pub fn apply_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::PointerMotion { x, y, dx, dy } => {
                self.mouse_position = [x, y];
                self.mouse_relative = [dx, dy];
            }
            PlatformEvent::PointerButton { button, pressed } => {
                self.mouse_buttons.set_state(button, pressed);
            }
            PlatformEvent::Key { key, pressed } => {
                self.keys.set_state(key, pressed);
            }
            PlatformEvent::DeviceButton {
                device,
                button,
                pressed,
            } => {
                let Some(joystick) = self.known_device(device, "button") else {
                    return;
                };
                if !joystick.set_button(button as usize, pressed) {
                    warn!(device = device.0, button, "joystick_button_out_of_range");
                }
            }
            PlatformEvent::DeviceHat { device, hat, value } => {
                let Some(joystick) = self.known_device(device, "hat") else {
                    return;
                };
                if !joystick.set_hat(hat as usize, value) {
                    warn!(device = device.0, hat, "joystick_hat_out_of_range");
                }
            }
            PlatformEvent::DeviceAxis {
                device,
                axis,
                value,
            } => {
                let Some(joystick) = self.known_device(device, "axis") else {
                    return;
                };
                if !joystick.set_axis(axis as usize, value) {
                    warn!(device = device.0, axis, "joystick_axis_out_of_range");
                }
            }
            PlatformEvent::Quit => {
                debug!("quit_event");
                self.quit_requested = true;
            }
        }
    }

    fn known_device(&mut self, device: DeviceIndex, kind: &'static str) -> Option<&mut Joystick> {
        let joystick = self.joysticks.get_mut(device);
        if joystick.is_none() {
            warn!(device = device.0, kind, "event_from_unknown_joystick_dropped");
        }
        joystick
    }

    pub fn key_state(&self, key: KeyCode) -> ToggleState {
        self.keys.state(key)
    }

    pub fn mouse_button_state(&self, button: MouseButton) -> ToggleState {
        self.mouse_buttons.state(button)
    }

    pub fn mouse_position(&self) -> [i32; 2] {
        self.mouse_position
    }

    pub fn mouse_relative_motion(&self) -> [i32; 2] {
        self.mouse_relative
    }

    pub fn joystick_count(&self) -> usize {
        self.joysticks.len()
    }

    pub fn joystick(&self, device: DeviceIndex) -> Option<&Joystick> {
        self.joysticks.get(device)
    }

    /// Normalized axis value, 0 for unknown devices or axes.
    pub fn joy_axis(&self, device: DeviceIndex, axis: usize) -> f32 {
        self.joysticks
            .get(device)
            .and_then(|joystick| joystick.axis(axis))
            .unwrap_or(0.0)
    }

    pub fn joy_button(&self, device: DeviceIndex, button: usize) -> ToggleState {
        self.joysticks
            .get(device)
            .and_then(|joystick| joystick.button(button))
            .unwrap_or_default()
    }

    pub fn joy_hat(&self, device: DeviceIndex, hat: usize) -> u8 {
        self.joysticks
            .get(device)
            .and_then(|joystick| joystick.hat(hat))
            .unwrap_or(hat::CENTERED)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::{DeviceInfo, QueuedEventSource};

    fn triple(state: ToggleState) -> (bool, bool, bool) {
        (state.is_held(), state.just_pressed(), state.just_released())
    }

    fn key(key: KeyCode, pressed: bool) -> PlatformEvent {
        PlatformEvent::Key { key, pressed }
    }

    fn system_with_pad() -> EventSystem {
        let source = QueuedEventSource::with_devices(vec![DeviceInfo {
            index: DeviceIndex(0),
            name: "test pad".to_string(),
            axes: 2,
            buttons: 6,
            hats: 1,
        }]);
        let mut events = EventSystem::new();
        events.init(&source);
        events
    }

    #[test]
    fn key_lifecycle_matches_two_phase_protocol() {
        let mut events = EventSystem::new();

        events.apply_event(key(KeyCode::KeyT, true));
        assert_eq!(triple(events.key_state(KeyCode::KeyT)), (true, true, false));

        events.age_toggles();
        assert_eq!(triple(events.key_state(KeyCode::KeyT)), (true, false, false));
        events.age_toggles();
        assert_eq!(triple(events.key_state(KeyCode::KeyT)), (true, false, false));

        events.apply_event(key(KeyCode::KeyT, false));
        assert_eq!(triple(events.key_state(KeyCode::KeyT)), (false, false, true));

        events.age_toggles();
        assert_eq!(triple(events.key_state(KeyCode::KeyT)), (false, false, false));
        events.age_toggles();
        assert_eq!(triple(events.key_state(KeyCode::KeyT)), (false, false, false));
    }

    #[test]
    fn mouse_button_lifecycle_matches_keys() {
        let mut events = EventSystem::new();
        let press = PlatformEvent::PointerButton {
            button: MouseButton::Left,
            pressed: true,
        };
        let release = PlatformEvent::PointerButton {
            button: MouseButton::Left,
            pressed: false,
        };

        events.apply_event(press);
        assert_eq!(
            triple(events.mouse_button_state(MouseButton::Left)),
            (true, true, false)
        );
        events.age_toggles();
        assert_eq!(
            triple(events.mouse_button_state(MouseButton::Left)),
            (true, false, false)
        );
        events.apply_event(release);
        assert_eq!(
            triple(events.mouse_button_state(MouseButton::Left)),
            (false, false, true)
        );
        events.age_toggles();
        assert_eq!(
            triple(events.mouse_button_state(MouseButton::Left)),
            (false, false, false)
        );
    }

    #[test]
    fn process_events_exposes_edge_for_one_frame() {
        let mut events = EventSystem::new();
        let mut source = QueuedEventSource::new();

        source.push(key(KeyCode::Space, true));
        events.process_events(&mut source);
        assert!(events.key_state(KeyCode::Space).just_pressed());

        events.process_events(&mut source);
        assert!(!events.key_state(KeyCode::Space).just_pressed());
        assert!(events.key_state(KeyCode::Space).is_held());
    }

    #[test]
    fn mouse_motion_last_write_wins() {
        let mut events = EventSystem::new();
        let mut source = QueuedEventSource::new();
        source.push(PlatformEvent::PointerMotion {
            x: 10,
            y: 10,
            dx: 5,
            dy: 5,
        });
        source.push(PlatformEvent::PointerMotion {
            x: 50,
            y: 55,
            dx: 2,
            dy: 1,
        });

        events.process_events(&mut source);

        assert_eq!(events.mouse_position(), [50, 55]);
        assert_eq!(events.mouse_relative_motion(), [2, 1]);
    }

    #[test]
    fn quit_event_raises_flag() {
        let mut events = EventSystem::new();
        assert!(!events.quit_requested());

        let mut source = QueuedEventSource::new();
        source.push(PlatformEvent::Quit);
        events.process_events(&mut source);

        assert!(events.quit_requested());
    }

    #[test]
    fn init_enumerates_devices() {
        let events = system_with_pad();

        assert_eq!(events.joystick_count(), 1);
        let pad = events.joystick(DeviceIndex(0)).expect("pad");
        assert_eq!(pad.axis_count(), 2);
        assert_eq!(pad.button_count(), 10);
        assert_eq!(pad.hat_count(), 1);
    }

    #[test]
    fn device_button_is_edge_tracked() {
        let mut events = system_with_pad();
        let mut source = QueuedEventSource::new();
        source.push(PlatformEvent::DeviceButton {
            device: DeviceIndex(0),
            button: 3,
            pressed: true,
        });

        events.process_events(&mut source);
        assert_eq!(triple(events.joy_button(DeviceIndex(0), 3)), (true, true, false));

        events.process_events(&mut source);
        assert_eq!(triple(events.joy_button(DeviceIndex(0), 3)), (true, false, false));
    }

    #[test]
    fn unknown_device_events_are_dropped() {
        let mut events = system_with_pad();
        let mut source = QueuedEventSource::new();
        source.push(PlatformEvent::DeviceButton {
            device: DeviceIndex(4),
            button: 0,
            pressed: true,
        });
        source.push(PlatformEvent::DeviceAxis {
            device: DeviceIndex(4),
            axis: 0,
            value: 1000,
        });
        source.push(PlatformEvent::DeviceHat {
            device: DeviceIndex(4),
            hat: 0,
            value: hat::UP,
        });
        source.push(key(KeyCode::KeyA, true));

        events.process_events(&mut source);

        assert_eq!(events.joystick_count(), 1);
        assert_eq!(events.joy_button(DeviceIndex(4), 0), ToggleState::default());
        assert_eq!(events.joy_axis(DeviceIndex(4), 0), 0.0);
        assert!(events.key_state(KeyCode::KeyA).just_pressed());
    }

    #[test]
    fn out_of_range_button_is_dropped() {
        let mut events = system_with_pad();
        events.apply_event(PlatformEvent::DeviceButton {
            device: DeviceIndex(0),
            button: 200,
            pressed: true,
        });

        let pad = events.joystick(DeviceIndex(0)).expect("pad");
        for button in 0..pad.button_count() {
            assert!(!events.joy_button(DeviceIndex(0), button).is_held());
        }
    }

    #[test]
    fn hat_up_sets_synthesized_up_button_only() {
        let mut events = system_with_pad();
        let mut source = QueuedEventSource::new();
        source.push(PlatformEvent::DeviceHat {
            device: DeviceIndex(0),
            hat: 0,
            value: hat::UP,
        });

        events.process_events(&mut source);

        let offset = events
            .joystick(DeviceIndex(0))
            .and_then(|pad| pad.hat_button_offset(0))
            .expect("offset");
        assert_eq!(offset, 6);
        assert_eq!(triple(events.joy_button(DeviceIndex(0), offset)), (true, true, false));
        for bit_position in 1..4 {
            assert_eq!(
                events.joy_button(DeviceIndex(0), offset + bit_position),
                ToggleState::default()
            );
        }
        assert_eq!(events.joy_hat(DeviceIndex(0), 0), hat::UP);
    }

    #[test]
    fn axis_motion_is_normalized() {
        let mut events = system_with_pad();
        events.apply_event(PlatformEvent::DeviceAxis {
            device: DeviceIndex(0),
            axis: 1,
            value: -16384,
        });

        assert_eq!(events.joy_axis(DeviceIndex(0), 1), -0.5);
        assert_eq!(events.joy_axis(DeviceIndex(0), 0), 0.0);
    }
}
