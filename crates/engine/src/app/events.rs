use std::collections::VecDeque;

use winit::event::MouseButton;
use winit::keyboard::KeyCode;

/// Device id as reported by the platform. Only meaningful once validated
/// against the enumerated joystick set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIndex(pub u32);

/// Hat direction bits, SDL layout.
pub mod hat {
    pub const CENTERED: u8 = 0;
    pub const UP: u8 = 1;
    pub const RIGHT: u8 = 2;
    pub const DOWN: u8 = 4;
    pub const LEFT: u8 = 8;

    /// Bits in synthesized-button order: up, right, down, left.
    pub const DIRECTIONS: [u8; 4] = [UP, RIGHT, DOWN, LEFT];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: DeviceIndex,
    pub name: String,
    pub axes: u8,
    pub buttons: u8,
    pub hats: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    PointerMotion {
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
    },
    PointerButton {
        button: MouseButton,
        pressed: bool,
    },
    Key {
        key: KeyCode,
        pressed: bool,
    },
    DeviceButton {
        device: DeviceIndex,
        button: u8,
        pressed: bool,
    },
    DeviceHat {
        device: DeviceIndex,
        hat: u8,
        value: u8,
    },
    DeviceAxis {
        device: DeviceIndex,
        axis: u8,
        value: i16,
    },
    Quit,
}

/// Pollable platform queue. `poll_event` must never block.
pub trait EventSource {
    fn poll_event(&mut self) -> Option<PlatformEvent>;

    /// Devices present at startup. Called once, by `EventSystem::init`.
    fn devices(&self) -> Vec<DeviceInfo> {
        Vec::new()
    }
}

/// FIFO source fed by the window layer or by tests.
#[derive(Debug, Default)]
pub struct QueuedEventSource {
    pending: VecDeque<PlatformEvent>,
    devices: Vec<DeviceInfo>,
}

impl QueuedEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<DeviceInfo>) -> Self {
        Self {
            pending: VecDeque::new(),
            devices,
        }
    }

    pub fn push(&mut self, event: PlatformEvent) {
        self.pending.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Extend<PlatformEvent> for QueuedEventSource {
    fn extend<T: IntoIterator<Item = PlatformEvent>>(&mut self, iter: T) {
        self.pending.extend(iter);
    }
}

impl EventSource for QueuedEventSource {
    fn poll_event(&mut self) -> Option<PlatformEvent> {
        self.pending.pop_front()
    }

    fn devices(&self) -> Vec<DeviceInfo> {
        self.devices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_drains_in_push_order() {
        let mut source = QueuedEventSource::new();
        source.push(PlatformEvent::Quit);
        source.push(PlatformEvent::Key {
            key: KeyCode::KeyT,
            pressed: true,
        });

        assert_eq!(source.poll_event(), Some(PlatformEvent::Quit));
        assert!(matches!(
            source.poll_event(),
            Some(PlatformEvent::Key { key: KeyCode::KeyT, pressed: true })
        ));
        assert_eq!(source.poll_event(), None);
    }

    #[test]
    fn hat_directions_cover_all_bits_once() {
        let combined = hat::DIRECTIONS.iter().fold(0u8, |acc, bit| acc | bit);
        assert_eq!(combined, hat::UP | hat::RIGHT | hat::DOWN | hat::LEFT);
        assert_eq!(combined.count_ones(), 4);
    }
}
