mod audio;
mod input;
mod render;
mod sink;
mod state;

pub use audio::{AudioBridge, AudioError, AudioResult};
pub use input::{InputNormalizer, NormalizedInput, button_mask, fold_thumbstick, quit_requested};
pub use render::{
    PresentationPipeline, SCALE, destination_rect, dim_rgb565, presentation_width, scale_frame,
};
pub use sink::SessionFrameSink;
pub use state::{
    LoadOutcome, StateError, StateResult, load as load_state, save as save_state, save_path_for,
};

use crate::config::{ConfigError, SessionConfig};
use crate::device::{AudioOutput, GamepadPoller, Presenter};
use lynxgo_common::frontend::{DisplayAttributes, EmulatorCore, PixelFormat, ScreenRotation};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Audio(#[from] AudioError),
    #[error("{0}")]
    State(#[from] StateError),
    #[error("Emulation core error: {0}")]
    Core(#[source] Box<dyn Error + Send + Sync + 'static>),
    #[error("Error presenting frame: {0}")]
    Present(#[source] Box<dyn Error + Send + Sync + 'static>),
    #[error("Error reading gamepad: {0}")]
    Input(#[source] Box<dyn Error + Send + Sync + 'static>),
}

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Poll input and hand it to the core
    Running,
    /// Step the core until it completes a frame
    FrameWait,
    /// Show the completed frame
    Presenting,
    /// Persist state before exiting
    Stopping,
    Stopped,
}

/// Shared flag that asks a session to stop at its next check, including in the middle of waiting
/// for a frame.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

pub struct Devices<P, A, G> {
    pub presenter: P,
    pub audio: A,
    pub gamepad: G,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub frames_presented: u64,
    pub audio_submissions: u64,
    pub state_bytes_saved: usize,
}

pub struct Session<Core, P, A, G> {
    core: Core,
    sink: SessionFrameSink<A>,
    input: InputNormalizer<G>,
    pipeline: PresentationPipeline<P>,
    save_path: PathBuf,
    state: SessionState,
    stop_handle: StopHandle,
    frames_presented: u64,
    state_bytes_saved: usize,
}

impl<Core, P, A, G> Session<Core, P, A, G>
where
    Core: EmulatorCore,
    P: Presenter,
    A: AudioOutput,
    G: GamepadPoller,
{
    /// Attach `core` to `devices` and restore the state saved for `rom_path`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the audio device does not match the core's sample rate, the save path
    /// cannot be determined, or an existing save file is corrupt. No frame has run in any of these
    /// cases.
    pub fn new(
        mut core: Core,
        devices: Devices<P, A, G>,
        rom_path: &Path,
        config: &SessionConfig,
    ) -> SessionResult<Self> {
        let Devices { presenter, audio, gamepad } = devices;
        let frame_size = Core::frame_size();

        core.display_set_attributes(DisplayAttributes {
            rotation: ScreenRotation::None,
            pixel_format: PixelFormat::Rgb565,
            stride: frame_size.width as usize,
        });

        let audio = AudioBridge::new(audio, Core::AUDIO_SAMPLE_RATE)?;
        let sink = SessionFrameSink::new(frame_size, audio);
        let input = InputNormalizer::new(gamepad, config.axis_trim);
        let pipeline = PresentationPipeline::new(presenter, frame_size);

        let save_path = save_path_for(rom_path, &config.save_directory()?)?;
        log::info!("Save path: '{}'", save_path.display());

        if state::load(&mut core, &save_path)? == LoadOutcome::NoState {
            log::info!("No saved state; starting from power-on");
        }

        Ok(Self {
            core,
            sink,
            input,
            pipeline,
            save_path,
            state: SessionState::Running,
            stop_handle: StopHandle::default(),
            frames_presented: 0,
            state_bytes_saved: 0,
        })
    }

    /// Replace the session's stop handle with one shared with another owner.
    #[must_use]
    pub fn with_stop_handle(mut self, stop_handle: StopHandle) -> Self {
        self.stop_handle = stop_handle;
        self
    }

    /// Perform one state transition and return the new state.
    ///
    /// # Errors
    ///
    /// Propagates core, device and save errors. The session stays in the state it was in and no
    /// state is saved.
    pub fn step(&mut self) -> SessionResult<SessionState> {
        let next = match self.state {
            SessionState::Running => self.poll_input()?,
            SessionState::FrameWait => self.wait_for_frame()?,
            SessionState::Presenting => {
                self.pipeline
                    .present(self.sink.frame(), self.sink.stride())
                    .map_err(|err| SessionError::Present(err.into()))?;
                self.frames_presented += 1;

                SessionState::Running
            }
            SessionState::Stopping => {
                self.state_bytes_saved = state::save(&self.core, &self.save_path)?;
                SessionState::Stopped
            }
            SessionState::Stopped => SessionState::Stopped,
        };

        if next != self.state {
            log::trace!("Session {:?} -> {next:?}", self.state);
        }
        self.state = next;

        Ok(next)
    }

    /// Step until stopped by the quit button or the stop handle.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Self::step`].
    pub fn run(&mut self) -> SessionResult<SessionSummary> {
        while self.step()? != SessionState::Stopped {}

        let summary = self.summary();
        log::info!(
            "Session ended after {} frames ({} audio blocks, {} dropped); saved {} bytes",
            summary.frames_presented,
            summary.audio_submissions,
            self.sink.dropped_audio_blocks(),
            summary.state_bytes_saved
        );

        Ok(summary)
    }

    fn poll_input(&mut self) -> SessionResult<SessionState> {
        if self.stop_handle.is_stop_requested() {
            return Ok(SessionState::Stopping);
        }

        let input = self.input.poll().map_err(|err| SessionError::Input(err.into()))?;
        if input.quit {
            log::info!("Quit requested");
            return Ok(SessionState::Stopping);
        }

        self.core.set_button_data(input.buttons);

        Ok(SessionState::FrameWait)
    }

    fn wait_for_frame(&mut self) -> SessionResult<SessionState> {
        loop {
            if self.stop_handle.is_stop_requested() {
                log::info!("Stop requested while waiting for frame");
                return Ok(SessionState::Stopping);
            }

            self.core.update(&mut self.sink).map_err(|err| SessionError::Core(err.into()))?;

            if self.sink.take_frame_ready() {
                return Ok(SessionState::Presenting);
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            frames_presented: self.frames_presented,
            audio_submissions: self.sink.audio().submissions(),
            state_bytes_saved: self.state_bytes_saved,
        }
    }

    #[must_use]
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn presenter(&self) -> &P {
        self.pipeline.presenter()
    }

    pub fn audio_output(&self) -> &A {
        self.sink.audio().output()
    }

    pub fn gamepad(&self) -> &G {
        self.input.gamepad()
    }
}
