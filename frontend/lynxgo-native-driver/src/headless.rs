//! Devices with no hardware behind them: a presenter that records what it was asked to show, an
//! audio sink that counts samples and a gamepad that replays a script

use crate::device::{
    AudioOutput, DisplaySize, GamepadPoller, GamepadState, Presenter, Rect, Rotation, Surface,
};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error("Headless audio device rejected {frames} frames")]
    AudioRejected { frames: usize },
}

#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub surface: Surface,
    pub src: Rect,
    pub dst: Rect,
    pub rotation: Rotation,
}

#[derive(Debug)]
pub struct HeadlessPresenter {
    display: DisplaySize,
    posts: u64,
    last_post: Option<RecordedPost>,
}

impl HeadlessPresenter {
    #[must_use]
    pub fn new(display: DisplaySize) -> Self {
        Self { display, posts: 0, last_post: None }
    }

    #[must_use]
    pub fn posts(&self) -> u64 {
        self.posts
    }

    #[must_use]
    pub fn last_post(&self) -> Option<&RecordedPost> {
        self.last_post.as_ref()
    }
}

impl Presenter for HeadlessPresenter {
    type Err = HeadlessError;

    fn display_size(&self) -> DisplaySize {
        self.display
    }

    fn post(
        &mut self,
        surface: &Surface,
        src: Rect,
        dst: Rect,
        rotation: Rotation,
    ) -> Result<(), Self::Err> {
        match &mut self.last_post {
            Some(post) => {
                post.surface.clone_from(surface);
                post.src = src;
                post.dst = dst;
                post.rotation = rotation;
            }
            None => {
                self.last_post = Some(RecordedPost { surface: surface.clone(), src, dst, rotation });
            }
        }

        self.posts += 1;
        log::trace!("Headless post #{}: {src} -> {dst} at {}deg", self.posts, rotation.degrees());

        Ok(())
    }
}

#[derive(Debug)]
pub struct HeadlessAudio {
    sample_rate: u32,
    submissions: u64,
    frames_submitted: u64,
    reject_all: bool,
}

impl HeadlessAudio {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate, submissions: 0, frames_submitted: 0, reject_all: false }
    }

    /// Device that refuses every submission.
    #[must_use]
    pub fn failing(sample_rate: u32) -> Self {
        Self { reject_all: true, ..Self::new(sample_rate) }
    }

    #[must_use]
    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    #[must_use]
    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }
}

impl AudioOutput for HeadlessAudio {
    type Err = HeadlessError;

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn submit(&mut self, _samples: &[i16], frames: usize) -> Result<(), Self::Err> {
        if self.reject_all {
            return Err(HeadlessError::AudioRejected { frames });
        }

        self.submissions += 1;
        self.frames_submitted += frames as u64;

        Ok(())
    }
}

/// Replays a fixed sequence of snapshots, then reports an idle pad.
///
/// With [`ScriptedGamepad::quit_after`], the poll following the given number of polls holds F1.
#[derive(Debug, Default)]
pub struct ScriptedGamepad {
    script: VecDeque<GamepadState>,
    quit_after: Option<u64>,
    polls: u64,
}

impl ScriptedGamepad {
    pub fn new(script: impl IntoIterator<Item = GamepadState>) -> Self {
        Self { script: script.into_iter().collect(), quit_after: None, polls: 0 }
    }

    /// Request quit once `polls` snapshots have been returned, i.e. after that many frames.
    #[must_use]
    pub fn quit_after(mut self, polls: u64) -> Self {
        self.quit_after = Some(polls);
        self
    }

    #[must_use]
    pub fn polls(&self) -> u64 {
        self.polls
    }
}

impl GamepadPoller for ScriptedGamepad {
    type Err = HeadlessError;

    fn poll(&mut self) -> Result<GamepadState, Self::Err> {
        let mut state = self.script.pop_front().unwrap_or_default();
        if self.quit_after.is_some_and(|quit_after| self.polls >= quit_after) {
            state.buttons.f1 = true;
        }

        self.polls += 1;

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_then_idle_then_quit() {
        let mut pressed = GamepadState::default();
        pressed.buttons.a = true;

        let mut gamepad = ScriptedGamepad::new([pressed]).quit_after(2);

        assert_eq!(gamepad.poll().unwrap(), pressed);
        assert_eq!(gamepad.poll().unwrap(), GamepadState::default());
        assert!(gamepad.poll().unwrap().buttons.f1);
        assert_eq!(gamepad.polls(), 3);
    }

    #[test]
    fn presenter_keeps_latest_surface() {
        let mut presenter = HeadlessPresenter::new(DisplaySize { width: 4, height: 2 });
        let mut surface = Surface::new(2, 1);
        let rect = surface.full_rect();

        presenter.post(&surface, rect, rect, Rotation::Degrees0).unwrap();
        surface.pixels_mut()[1] = 7;
        presenter.post(&surface, rect, rect, Rotation::Degrees270).unwrap();

        let post = presenter.last_post().unwrap();
        assert_eq!(presenter.posts(), 2);
        assert_eq!(post.surface.pixel(1, 0), 7);
        assert_eq!(post.rotation, Rotation::Degrees270);
    }
}
