use tracing::warn;

use super::events::{hat, DeviceIndex, DeviceInfo};
use super::input::ToggleState;

/// Device indices at or above this are rejected at enumeration.
pub const MAX_JOYSTICKS: usize = 64;

const HAT_BUTTONS: usize = 4;
const AXIS_SCALE: f32 = 32768.0;

/// State of one enumerated joystick.
///
/// The button table holds the physical buttons followed by four synthesized
/// buttons per hat (up, right, down, left).
#[derive(Debug, Clone)]
pub struct Joystick {
    index: DeviceIndex,
    name: String,
    axes: Vec<f32>,
    buttons: Vec<ToggleState>,
    hats: Vec<u8>,
}

impl Joystick {
    pub fn new(info: &DeviceInfo) -> Self {
        let hat_count = info.hats as usize;
        Self {
            index: info.index,
            name: info.name.clone(),
            axes: vec![0.0; info.axes as usize],
            buttons: vec![ToggleState::default(); info.buttons as usize + hat_count * HAT_BUTTONS],
            hats: vec![hat::CENTERED; hat_count],
        }
    }

    pub fn index(&self) -> DeviceIndex {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn hat_count(&self) -> usize {
        self.hats.len()
    }

    pub fn axis(&self, axis: usize) -> Option<f32> {
        self.axes.get(axis).copied()
    }

    pub fn button(&self, button: usize) -> Option<ToggleState> {
        self.buttons.get(button).copied()
    }

    pub fn hat(&self, hat: usize) -> Option<u8> {
        self.hats.get(hat).copied()
    }

    /// First synthesized button of `hat`.
    pub fn hat_button_offset(&self, hat: usize) -> Option<usize> {
        if hat >= self.hats.len() {
            return None;
        }
        Some(self.buttons.len() - (self.hats.len() - hat) * HAT_BUTTONS)
    }

    pub(crate) fn age_toggles(&mut self) {
        for button in &mut self.buttons {
            button.age();
        }
    }

    /// Returns `false` when the button does not exist.
    pub(crate) fn set_button(&mut self, button: usize, pressed: bool) -> bool {
        match self.buttons.get_mut(button) {
            Some(toggle) => {
                toggle.set_state(pressed);
                true
            }
            None => false,
        }
    }

    /// Stores `raw / 32768`. Returns `false` when the axis does not exist.
    pub(crate) fn set_axis(&mut self, axis: usize, raw: i16) -> bool {
        match self.axes.get_mut(axis) {
            Some(value) => {
                *value = raw as f32 / AXIS_SCALE;
                true
            }
            None => false,
        }
    }

    /// Applies a new hat mask, toggling only the synthesized buttons whose
    /// direction bit changed. Returns `false` when the hat does not exist.
    pub(crate) fn set_hat(&mut self, hat: usize, value: u8) -> bool {
        let Some(offset) = self.hat_button_offset(hat) else {
            return false;
        };

        let previous = self.hats[hat];
        if previous == value {
            return true;
        }

        for (bit_position, bit) in hat::DIRECTIONS.iter().enumerate() {
            let was_set = previous & bit != 0;
            let is_set = value & bit != 0;
            if was_set != is_set {
                self.buttons[offset + bit_position].set_state(is_set);
            }
        }
        self.hats[hat] = value;
        true
    }
}

/// Joysticks keyed by the index the platform assigned at enumeration.
#[derive(Debug, Clone, Default)]
pub struct JoystickArena {
    slots: Vec<Option<Joystick>>,
}

impl JoystickArena {
    pub fn from_devices(devices: &[DeviceInfo]) -> Self {
        let mut arena = Self::default();
        for info in devices {
            arena.insert(Joystick::new(info));
        }
        arena
    }

    fn insert(&mut self, joystick: Joystick) {
        let slot = joystick.index().0 as usize;
        if slot >= MAX_JOYSTICKS {
            warn!(index = slot, max = MAX_JOYSTICKS, "joystick_index_out_of_range");
            return;
        }
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        self.slots[slot] = Some(joystick);
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: DeviceIndex) -> Option<&Joystick> {
        self.slots.get(index.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: DeviceIndex) -> Option<&mut Joystick> {
        self.slots.get_mut(index.0 as usize).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Joystick> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Joystick> {
        self.slots.iter_mut().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(index: u32, buttons: u8, hats: u8) -> DeviceInfo {
        DeviceInfo {
            index: DeviceIndex(index),
            name: format!("pad {index}"),
            axes: 2,
            buttons,
            hats,
        }
    }

    #[test]
    fn button_table_reserves_four_per_hat() {
        let joystick = Joystick::new(&pad(0, 10, 2));

        assert_eq!(joystick.button_count(), 18);
        assert_eq!(joystick.hat_button_offset(0), Some(10));
        assert_eq!(joystick.hat_button_offset(1), Some(14));
        assert_eq!(joystick.hat_button_offset(2), None);
    }

    #[test]
    fn hat_up_sets_only_up_button() {
        let mut joystick = Joystick::new(&pad(0, 4, 1));
        assert!(joystick.set_hat(0, hat::UP));

        let offset = joystick.hat_button_offset(0).expect("offset");
        let up = joystick.button(offset).expect("up");
        assert!(up.is_held() && up.just_pressed());
        for bit_position in 1..4 {
            let other = joystick.button(offset + bit_position).expect("button");
            assert_eq!(other, ToggleState::default());
        }
        assert_eq!(joystick.hat(0), Some(hat::UP));
    }

    #[test]
    fn hat_diagonal_to_right_releases_up_only() {
        let mut joystick = Joystick::new(&pad(0, 0, 1));
        joystick.set_hat(0, hat::UP | hat::RIGHT);
        joystick.age_toggles();
        joystick.set_hat(0, hat::RIGHT);

        let up = joystick.button(0).expect("up");
        let right = joystick.button(1).expect("right");
        assert!(!up.is_held() && up.just_released());
        assert!(right.is_held() && !right.just_pressed());
    }

    #[test]
    fn axis_is_normalized() {
        let mut joystick = Joystick::new(&pad(0, 0, 0));
        joystick.set_axis(0, i16::MIN);
        joystick.set_axis(1, 16384);

        assert_eq!(joystick.axis(0), Some(-1.0));
        assert_eq!(joystick.axis(1), Some(0.5));
        assert!(!joystick.set_axis(2, 0));
    }

    #[test]
    fn arena_lookup_is_bounds_checked() {
        let arena = JoystickArena::from_devices(&[pad(0, 2, 0), pad(2, 3, 0)]);

        assert_eq!(arena.len(), 2);
        assert!(arena.get(DeviceIndex(0)).is_some());
        assert!(arena.get(DeviceIndex(1)).is_none());
        assert_eq!(
            arena.get(DeviceIndex(2)).map(Joystick::button_count),
            Some(3)
        );
        assert!(arena.get(DeviceIndex(99)).is_none());
    }

    #[test]
    fn arena_skips_out_of_range_index() {
        let arena = JoystickArena::from_devices(&[pad(1, 2, 0), pad(u32::MAX, 2, 0)]);

        assert_eq!(arena.len(), 1);
        assert!(arena.get(DeviceIndex(u32::MAX)).is_none());
        assert!(arena.get(DeviceIndex(1)).is_some());
        assert!(arena.slots.len() <= MAX_JOYSTICKS);
    }
}
