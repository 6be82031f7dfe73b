//! Keyboard input state.
//!
//! The [`Input`] set tracks which keys are currently pressed, just pressed
//! this tick, or just released this tick. The platform layer feeds it with
//! [`press`](Input::press)/[`release`](Input::release); the engine clears
//! the per-tick sets after every tick.
//!
//! Interactive events declare the keys they need as data and test them with
//! [`Input::pressed_all`].

use std::collections::HashSet;
use std::hash::Hash;

pub use winit::keyboard::KeyCode;

/// Tracks the state of a set of inputs.
///
/// - `pressed`: currently held down
/// - `just_pressed`: pressed this tick (not held last tick)
/// - `just_released`: released this tick
#[derive(Debug, Clone)]
pub struct Input<T: Eq + Hash + Copy> {
    pressed: HashSet<T>,
    just_pressed: HashSet<T>,
    just_released: HashSet<T>,
}

impl<T: Eq + Hash + Copy> Input<T> {
    pub fn new() -> Self {
        Self {
            pressed: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    /// Returns `true` if the input is currently held down.
    pub fn pressed(&self, input: T) -> bool {
        self.pressed.contains(&input)
    }

    /// Returns `true` if every input in `required` is held down.
    ///
    /// An empty requirement is always satisfied.
    pub fn pressed_all<'a>(&self, required: impl IntoIterator<Item = &'a T>) -> bool
    where
        T: 'a,
    {
        required.into_iter().all(|k| self.pressed.contains(k))
    }

    /// Returns `true` if the input was pressed this tick.
    pub fn just_pressed(&self, input: T) -> bool {
        self.just_pressed.contains(&input)
    }

    /// Returns `true` if the input was released this tick.
    pub fn just_released(&self, input: T) -> bool {
        self.just_released.contains(&input)
    }

    /// Everything currently held down.
    pub fn iter_pressed(&self) -> impl Iterator<Item = T> + '_ {
        self.pressed.iter().copied()
    }

    /// Call when an input is pressed.
    pub fn press(&mut self, input: T) {
        if self.pressed.insert(input) {
            self.just_pressed.insert(input);
        }
    }

    /// Call when an input is released.
    pub fn release(&mut self, input: T) {
        if self.pressed.remove(&input) {
            self.just_released.insert(input);
        }
    }

    /// Release everything at once (e.g. when the window loses focus).
    pub fn release_all(&mut self) {
        let held: Vec<T> = self.pressed.drain().collect();
        self.just_released.extend(held);
    }

    /// Clear per-tick state. Called by the engine after each tick.
    pub(crate) fn clear_just(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl<T: Eq + Hash + Copy> Default for Input<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Copy> FromIterator<T> for Input<T> {
    /// An input set with every item held (and just pressed).
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut input = Input::new();
        for key in iter {
            input.press(key);
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_and_release_track_edges() {
        let mut input = Input::new();
        input.press(KeyCode::ArrowUp);
        assert!(input.pressed(KeyCode::ArrowUp));
        assert!(input.just_pressed(KeyCode::ArrowUp));

        input.clear_just();
        assert!(input.pressed(KeyCode::ArrowUp));
        assert!(!input.just_pressed(KeyCode::ArrowUp));

        input.release(KeyCode::ArrowUp);
        assert!(!input.pressed(KeyCode::ArrowUp));
        assert!(input.just_released(KeyCode::ArrowUp));
    }

    #[test]
    fn pressed_all_is_subset_check() {
        let input: Input<KeyCode> = [KeyCode::Space, KeyCode::ArrowUp].into_iter().collect();
        assert!(input.pressed_all(&[KeyCode::Space]));
        assert!(input.pressed_all(&[KeyCode::Space, KeyCode::ArrowUp]));
        assert!(input.pressed_all(&[]));
        assert!(!input.pressed_all(&[KeyCode::Space, KeyCode::KeyW]));
    }

    #[test]
    fn release_all_clears_held_keys() {
        let mut input: Input<KeyCode> = [KeyCode::KeyA, KeyCode::KeyD].into_iter().collect();
        input.release_all();
        assert_eq!(input.iter_pressed().count(), 0);
        assert!(input.just_released(KeyCode::KeyA));
        assert!(input.just_released(KeyCode::KeyD));
    }
}
