use crate::device::{GamepadPoller, GamepadState};
use lynxgo_common::input::{Button, LogicalButtons};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedInput {
    pub buttons: LogicalButtons,
    pub quit: bool,
}

/// Press d-pad directions for stick deflections strictly beyond `trim`.
///
/// Only ever presses; a held d-pad direction stays held regardless of the stick.
#[must_use]
pub fn fold_thumbstick(mut state: GamepadState, trim: f32) -> GamepadState {
    if state.thumb.y < -trim {
        state.dpad.up = true;
    }
    if state.thumb.y > trim {
        state.dpad.down = true;
    }

    if state.thumb.x < -trim {
        state.dpad.left = true;
    }
    if state.thumb.x > trim {
        state.dpad.right = true;
    }

    state
}

#[must_use]
pub fn button_mask(state: &GamepadState) -> LogicalButtons {
    let mut buttons = LogicalButtons::NONE;

    buttons.set(Button::A, state.buttons.a);
    buttons.set(Button::B, state.buttons.b);
    buttons.set(Button::Option1, state.buttons.f5);
    buttons.set(Button::Option2, state.buttons.f6);
    buttons.set(Button::Pause, state.buttons.f3);
    buttons.set(Button::Up, state.dpad.up);
    buttons.set(Button::Down, state.dpad.down);
    buttons.set(Button::Left, state.dpad.left);
    buttons.set(Button::Right, state.dpad.right);

    buttons
}

#[inline]
#[must_use]
pub fn quit_requested(state: &GamepadState) -> bool {
    state.buttons.f1
}

pub struct InputNormalizer<G> {
    gamepad: G,
    trim: f32,
}

impl<G: GamepadPoller> InputNormalizer<G> {
    pub fn new(gamepad: G, trim: f32) -> Self {
        Self { gamepad, trim }
    }

    /// # Errors
    ///
    /// Propagates gamepad read errors.
    pub fn poll(&mut self) -> Result<NormalizedInput, G::Err> {
        let state = fold_thumbstick(self.gamepad.poll()?, self.trim);

        Ok(NormalizedInput { buttons: button_mask(&state), quit: quit_requested(&state) })
    }

    pub fn gamepad(&self) -> &G {
        &self.gamepad
    }
}
