use std::sync::atomic::{AtomicI8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    SteerLeft,
    SteerRight,
    Press,
    Quit,
}

const ACTION_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    /// -1 for left, 1 for right, 0 when neither or both are held.
    pub(crate) fn steer_direction(&self) -> i8 {
        let left = self.is_down(InputAction::SteerLeft) as i8;
        let right = self.is_down(InputAction::SteerRight) as i8;
        right - left
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::SteerLeft => 0,
            InputAction::SteerRight => 1,
            InputAction::Press => 2,
            InputAction::Quit => 3,
        }
    }
}

/// Latest steering sample. The UI thread writes it whenever keys change;
/// the simulation thread reads it once per tick.
#[derive(Clone, Debug, Default)]
pub struct SteerInput(Arc<AtomicI8>);

impl SteerInput {
    pub fn set(&self, direction: i8) {
        self.0.store(direction.clamp(-1, 1), Ordering::Relaxed);
    }

    pub fn sample(&self) -> f32 {
        self.0.load(Ordering::Relaxed) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_directions_cancel() {
        let mut states = ActionStates::default();
        states.set(InputAction::SteerLeft, true);
        states.set(InputAction::SteerRight, true);
        assert_eq!(states.steer_direction(), 0);

        states.set(InputAction::SteerRight, false);
        assert_eq!(states.steer_direction(), -1);
    }

    #[test]
    fn steer_input_is_shared_between_clones() {
        let writer = SteerInput::default();
        let reader = writer.clone();
        writer.set(5);
        assert_eq!(reader.sample(), 1.0);
        writer.set(-1);
        assert_eq!(reader.sample(), -1.0);
    }
}
