//! # Game Controller Input
//!
//! The controller is read once per control cycle as a [`PadFrame`]: the left stick position and
//! the buttons currently held.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use gilrs::{Axis, Button, GamepadId, Gilrs};
use log::info;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// State of the controller for one control cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PadFrame {
    /// Stick X, positive right, in `[-1, 1]`
    pub x: f64,

    /// Stick Y, positive down, in `[-1, 1]`
    pub y: f64,

    pub pressed: Vec<PadButton>,
}

/// A controller read through gilrs.
pub struct GilrsPad {
    gilrs: Gilrs,
    id: GamepadId,
    index: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Controller buttons used by the live drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadButton {
    Preset1,
    Preset2,
    Preset3,
    Preset4,

    /// Full speed while held
    Boost,

    /// Toggle calibration mode
    Calibrate,

    Quit,
}

#[derive(thiserror::Error, Debug)]
pub enum PadError {
    #[error("Could not initialise the controller input: {0}")]
    InitError(String),

    #[error("No controller with index {0} (found {1})")]
    NotFound(usize, usize),

    #[error("Controller {0} was disconnected")]
    Disconnected(usize),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Source of controller frames.
pub trait Pad {
    /// Read the current state of the controller.
    fn frame(&mut self) -> Result<PadFrame, PadError>;
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PadButton {
    pub const ALL: [PadButton; 7] = [
        PadButton::Preset1,
        PadButton::Preset2,
        PadButton::Preset3,
        PadButton::Preset4,
        PadButton::Boost,
        PadButton::Calibrate,
        PadButton::Quit,
    ];

    /// Preset buttons in preset order.
    pub const PRESETS: [PadButton; 4] = [
        PadButton::Preset1,
        PadButton::Preset2,
        PadButton::Preset3,
        PadButton::Preset4,
    ];

    /// Physical button on a standard layout controller.
    ///
    /// Presets 1 to 4 run clockwise around the face buttons from the top.
    fn gilrs_button(&self) -> Button {
        match self {
            PadButton::Preset1 => Button::North,
            PadButton::Preset2 => Button::East,
            PadButton::Preset3 => Button::South,
            PadButton::Preset4 => Button::West,
            PadButton::Boost => Button::RightTrigger2,
            PadButton::Calibrate => Button::Select,
            PadButton::Quit => Button::Start,
        }
    }
}

impl PadFrame {
    /// A frame with the stick at the given position and no buttons held.
    pub fn stick(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            pressed: Vec::new(),
        }
    }

    /// This frame with `button` also held.
    pub fn with(mut self, button: PadButton) -> Self {
        if !self.pressed.contains(&button) {
            self.pressed.push(button);
        }
        self
    }

    pub fn is_pressed(&self, button: PadButton) -> bool {
        self.pressed.contains(&button)
    }
}

impl GilrsPad {
    /// Open the controller with the given index, in the order gilrs lists them.
    pub fn new(index: usize) -> Result<Self, PadError> {
        let gilrs = Gilrs::new().map_err(|e| PadError::InitError(e.to_string()))?;

        let count = gilrs.gamepads().count();
        let (id, gamepad) = gilrs.gamepads()
            .nth(index)
            .ok_or(PadError::NotFound(index, count))?;

        info!("Using controller {}: {}", index, gamepad.name());

        Ok(Self { gilrs, id, index })
    }
}

impl Pad for GilrsPad {
    fn frame(&mut self) -> Result<PadFrame, PadError> {
        // Process pending events so the cached state is current
        while self.gilrs.next_event().is_some() {}

        let gamepad = self.gilrs.gamepad(self.id);
        if !gamepad.is_connected() {
            return Err(PadError::Disconnected(self.index));
        }

        let pressed = PadButton::ALL
            .iter()
            .copied()
            .filter(|b| gamepad.is_pressed(b.gilrs_button()))
            .collect();

        Ok(PadFrame {
            x: gamepad.value(Axis::LeftStickX) as f64,
            // gilrs reports up as positive
            y: -gamepad.value(Axis::LeftStickY) as f64,
            pressed,
        })
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::collections::VecDeque;

    /// Plays back a fixed sequence of frames, then holds the quit button.
    pub(crate) struct ScriptedPad {
        frames: VecDeque<PadFrame>,
    }

    impl ScriptedPad {
        pub(crate) fn new(frames: Vec<PadFrame>) -> Self {
            Self { frames: frames.into() }
        }
    }

    impl Pad for ScriptedPad {
        fn frame(&mut self) -> Result<PadFrame, PadError> {
            Ok(self.frames
                .pop_front()
                .unwrap_or_else(|| PadFrame::default().with(PadButton::Quit)))
        }
    }

    #[test]
    fn test_frame_buttons() {
        let frame = PadFrame::stick(0.5, -0.5)
            .with(PadButton::Boost)
            .with(PadButton::Boost);

        assert!(frame.is_pressed(PadButton::Boost));
        assert!(!frame.is_pressed(PadButton::Quit));
        assert_eq!(frame.pressed.len(), 1);
    }

    #[test]
    fn test_scripted_pad_ends_with_quit() {
        let mut pad = ScriptedPad::new(vec![PadFrame::stick(0.0, -1.0)]);
        assert_eq!(pad.frame().unwrap().y, -1.0);
        assert!(pad.frame().unwrap().is_pressed(PadButton::Quit));
    }
}
