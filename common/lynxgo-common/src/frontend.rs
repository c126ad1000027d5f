use crate::context::ContextCursor;
use crate::input::LogicalButtons;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.width * self.height
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Display for FrameSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rotation the core applies to its own output before handing frames to the frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenRotation {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    Rgb555,
    #[default]
    Rgb565,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayAttributes {
    pub rotation: ScreenRotation,
    pub pixel_format: PixelFormat,
    /// Distance between the starts of two consecutive rows, in pixels
    pub stride: usize,
}

/// Interleaved stereo 16-bit samples accumulated by a core between two completed frames.
#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    samples: Vec<i16>,
}

impl AudioBuffer {
    #[must_use]
    pub fn with_capacity(frames: usize) -> Self {
        Self { samples: Vec::with_capacity(2 * frames) }
    }

    #[inline]
    pub fn push_frame(&mut self, sample_l: i16, sample_r: i16) {
        self.samples.push(sample_l);
        self.samples.push(sample_r);
    }

    /// Number of stereo frames waiting to be submitted.
    #[inline]
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.samples.len() / 2
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    #[inline]
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Receiver for the core's end-of-frame callback.
///
/// A core calls [`FrameSink::frame_buffer`] to find the memory it should render the current frame
/// into and [`FrameSink::frame_complete`] exactly once when that frame is finished.
pub trait FrameSink {
    /// Buffer for the frame currently being rendered, `stride * height` pixels long.
    fn frame_buffer(&mut self) -> &mut [u16];

    /// Signal that the frame in `frame_buffer()` is complete.
    ///
    /// Implementations take ownership of any pending samples in `audio` and leave it empty. This
    /// runs on the core's render path and must not fail.
    fn frame_complete(&mut self, audio: &mut AudioBuffer);
}

pub trait EmulatorCore {
    type Err: Error + Send + Sync + 'static;

    const SCREEN_WIDTH: u32;
    const SCREEN_HEIGHT: u32;
    const AUDIO_SAMPLE_RATE: u32;

    #[must_use]
    fn frame_size() -> FrameSize {
        FrameSize { width: Self::SCREEN_WIDTH, height: Self::SCREEN_HEIGHT }
    }

    fn display_set_attributes(&mut self, attributes: DisplayAttributes);

    /// Set the buttons held for every following `update()` call.
    fn set_button_data(&mut self, buttons: LogicalButtons);

    /// Advance the core by an implementation-defined quantum.
    ///
    /// Calls `sink.frame_complete()` at most once.
    ///
    /// # Errors
    ///
    /// Propagates internal core failures.
    fn update<S: FrameSink>(&mut self, sink: &mut S) -> Result<(), Self::Err>;

    /// Exact number of bytes `context_save()` writes.
    fn context_size(&self) -> usize;

    /// Serialize the complete core state into `cursor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state does not fit in the cursor.
    fn context_save(&self, cursor: &mut ContextCursor<'_>) -> Result<(), Self::Err>;

    /// Restore the complete core state from `cursor`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor does not hold a state produced by `context_save()`.
    fn context_load(&mut self, cursor: &mut ContextCursor<'_>) -> Result<(), Self::Err>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_buffer_counts_stereo_frames() {
        let mut buffer = AudioBuffer::with_capacity(4);
        assert!(buffer.is_empty());

        buffer.push_frame(1, -1);
        buffer.push_frame(2, -2);
        assert_eq!(buffer.pending_frames(), 2);
        assert_eq!(buffer.samples(), &[1, -1, 2, -2]);

        buffer.clear();
        assert_eq!(buffer.pending_frames(), 0);
    }

    #[test]
    fn frame_size_len() {
        let size = FrameSize { width: 160, height: 102 };
        assert_eq!(size.len(), 16320);
        assert!(!size.is_empty());
        assert_eq!(size.to_string(), "160x102");
    }
}
