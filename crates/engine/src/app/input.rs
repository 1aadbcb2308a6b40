use std::collections::HashMap;
use std::hash::Hash;

/// Held/edge state of one digital input.
///
/// Edges live until the next [`ToggleState::age`], so a press is observable
/// for exactly one frame when the caller ages once per frame before applying
/// new events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToggleState {
    held: bool,
    just_pressed: bool,
    just_released: bool,
}

impl ToggleState {
    pub fn set_state(&mut self, pressed: bool) {
        if pressed == self.held {
            return;
        }

        self.held = pressed;
        self.just_pressed = pressed;
        self.just_released = !pressed;
    }

    pub fn age(&mut self) {
        self.just_pressed = false;
        self.just_released = false;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn just_pressed(&self) -> bool {
        self.just_pressed
    }

    pub fn just_released(&self) -> bool {
        self.just_released
    }
}

/// Identifier → toggle map. Entries appear on first write and are never removed.
#[derive(Debug, Clone)]
pub struct InputRegistry<K> {
    toggles: HashMap<K, ToggleState>,
}

impl<K> Default for InputRegistry<K> {
    fn default() -> Self {
        Self {
            toggles: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> InputRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&mut self, id: K, pressed: bool) {
        self.toggles.entry(id).or_default().set_state(pressed);
    }

    pub fn state(&self, id: K) -> ToggleState {
        self.toggles.get(&id).copied().unwrap_or_default()
    }

    pub fn age_all(&mut self) {
        for toggle in self.toggles.values_mut() {
            toggle.age();
        }
    }

    pub fn contains(&self, id: K) -> bool {
        self.toggles.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.toggles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty()
    }
}
