//! Device-facing traits the session drives: a display that accepts rotated blits, an audio sink
//! and a gamepad

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Degrees0,
    Degrees90,
    Degrees180,
    Degrees270,
}

impl Rotation {
    #[inline]
    #[must_use]
    pub const fn degrees(self) -> u32 {
        match self {
            Self::Degrees0 => 0,
            Self::Degrees90 => 90,
            Self::Degrees180 => 180,
            Self::Degrees270 => 270,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

impl Display for Rect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Display dimensions in the orientation frames are viewed in, i.e. landscape for a panel that
/// scans out in portrait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl Display for DisplaySize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Row-major RGB565 image handed to a [`Presenter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u16>,
}

impl Surface {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0; (width * height) as usize] }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u16] {
        &mut self.pixels
    }

    #[inline]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> u16 {
        self.pixels[(y * self.width + x) as usize]
    }

    #[must_use]
    pub fn full_rect(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dpad {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GamepadButtons {
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub top_left: bool,
    pub top_right: bool,
    pub f1: bool,
    pub f2: bool,
    pub f3: bool,
    pub f4: bool,
    pub f5: bool,
    pub f6: bool,
}

/// Analog stick position; each axis is in -1.0..=1.0 with negative values meaning up/left.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thumbstick {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GamepadState {
    pub dpad: Dpad,
    pub buttons: GamepadButtons,
    pub thumb: Thumbstick,
}

pub trait Presenter {
    type Err: Error + Send + Sync + 'static;

    fn display_size(&self) -> DisplaySize;

    /// Blit `src` of `surface` into `dst`, rotating by `rotation`, and show the result.
    ///
    /// `dst` is in the panel's native scan-out coordinates.
    ///
    /// # Errors
    ///
    /// Returns an error if the device fails to upload or show the image.
    fn post(
        &mut self,
        surface: &Surface,
        src: Rect,
        dst: Rect,
        rotation: Rotation,
    ) -> Result<(), Self::Err>;
}

pub trait AudioOutput {
    type Err: Error + Send + Sync + 'static;

    /// Playback rate the device was opened at.
    fn sample_rate(&self) -> u32;

    /// Queue `frames` interleaved stereo frames. `samples.len()` is `2 * frames`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects the samples.
    fn submit(&mut self, samples: &[i16], frames: usize) -> Result<(), Self::Err>;
}

pub trait GamepadPoller {
    type Err: Error + Send + Sync + 'static;

    /// Read a fresh snapshot of every control.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be read.
    fn poll(&mut self) -> Result<GamepadState, Self::Err>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_indexing_is_row_major() {
        let mut surface = Surface::new(3, 2);
        surface.pixels_mut()[4] = 0xABCD;

        assert_eq!(surface.pixel(1, 1), 0xABCD);
        assert_eq!(surface.full_rect(), Rect::new(0, 0, 3, 2));
    }
}
