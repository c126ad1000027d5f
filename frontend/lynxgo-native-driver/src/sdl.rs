//! SDL3 devices for running a session in a desktop window
//!
//! The window plays the part of the handheld's panel turned on its side: the presenter maps the
//! portrait scan-out rectangle it is given back into the landscape window.

use crate::config::SessionConfig;
use crate::device::{
    AudioOutput, DisplaySize, Dpad, GamepadButtons, GamepadPoller, GamepadState, Presenter, Rect,
    Rotation, Surface, Thumbstick,
};
use crate::mainloop::Devices;
use sdl3::audio::{AudioCallback, AudioFormat, AudioSpec, AudioStream, AudioStreamWithCallback};
use sdl3::event::Event;
use sdl3::gamepad::{Axis, Button, Gamepad};
use sdl3::keyboard::Scancode;
use sdl3::pixels::{Color, PixelFormat};
use sdl3::render::{FPoint, FRect, Texture, TextureCreator, WindowCanvas};
use sdl3::video::{WindowBuildError, WindowContext};
use sdl3::{EventPump, IntegerOrSdlError, Sdl};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

const WINDOW_TITLE: &str = "lynxgo";

// Always output in stereo
const CHANNELS: i32 = 2;

// Panel's scan-out frame is rotated 90 degrees from the window's
const PANEL_TO_WINDOW_DEGREES: u32 = 90;

#[derive(Debug, Error)]
pub enum SdlError {
    #[error("Error initializing SDL3: {0}")]
    Init(sdl3::Error),
    #[error("Error initializing SDL3 video subsystem: {0}")]
    VideoInit(sdl3::Error),
    #[error("Error initializing SDL3 audio subsystem: {0}")]
    AudioInit(sdl3::Error),
    #[error("Error initializing SDL3 gamepad subsystem: {0}")]
    GamepadInit(sdl3::Error),
    #[error("Error initializing SDL3 event pump: {0}")]
    EventPumpInit(sdl3::Error),
    #[error("Error creating SDL3 window: {0}")]
    CreateWindow(#[from] WindowBuildError),
    #[error("Error opening gamepad {id}: {source}")]
    GamepadOpen {
        id: u32,
        #[source]
        source: IntegerOrSdlError,
    },
    #[error("Error creating SDL3 texture: {0}")]
    CreateTexture(String),
    #[error("Error uploading frame to SDL3 texture: {0}")]
    UpdateTexture(String),
    #[error("Error drawing frame: {0}")]
    Render(sdl3::Error),
    #[error("Error opening SDL3 audio stream: {0}")]
    OpenStream(sdl3::Error),
    #[error("Error pushing audio samples to SDL3 audio stream: {0}")]
    QueueAudio(sdl3::Error),
}

pub type SdlResult<T> = Result<T, SdlError>;

/// Open a window, an audio stream at `sample_rate` and the first connected gamepad, then hand the
/// devices to `f`.
///
/// The devices borrow SDL state owned by this call, so they only live for the duration of `f`.
///
/// # Errors
///
/// Returns an error if any SDL3 subsystem fails to initialize.
pub fn with_sdl3_devices<R>(
    config: &SessionConfig,
    sample_rate: u32,
    f: impl FnOnce(Devices<SdlPresenter<'_>, SdlAudioOutput, SdlGamepad>) -> R,
) -> SdlResult<R> {
    let sdl = sdl3::init().map_err(SdlError::Init)?;
    let video = sdl.video().map_err(SdlError::VideoInit)?;
    let audio = sdl.audio().map_err(SdlError::AudioInit)?;
    let gamepad_subsystem = sdl.gamepad().map_err(SdlError::GamepadInit)?;
    let event_pump = sdl.event_pump().map_err(SdlError::EventPumpInit)?;

    // Allow gamepad inputs while window does not have focus
    sdl3::hint::set("SDL_JOYSTICK_ALLOW_BACKGROUND_EVENTS", "1");

    let display = config.display_size();
    let mut window_builder = video.window(WINDOW_TITLE, display.width, display.height);
    window_builder.position_centered();
    let window = window_builder.build()?;
    let canvas = window.into_canvas();
    let texture_creator = canvas.texture_creator();

    let gamepad = match gamepad_subsystem.gamepads().map_err(SdlError::GamepadInit)?.first() {
        Some(&id) => {
            let gamepad = gamepad_subsystem
                .open(id)
                .map_err(|source| SdlError::GamepadOpen { id, source })?;
            log::info!("Using gamepad {id}");
            Some(gamepad)
        }
        None => {
            log::info!("No gamepad connected; using keyboard controls");
            None
        }
    };

    let audio_output = SdlAudioOutput::open(&audio, sample_rate, config.audio_buffer_size)?;

    let devices = Devices {
        presenter: SdlPresenter {
            canvas,
            texture_creator: &texture_creator,
            texture: None,
            display,
            background: argb_to_color(config.background_color),
            texture_bytes: Vec::new(),
        },
        audio: audio_output,
        gamepad: SdlGamepad { event_pump, gamepad, quit_event: false, _sdl: sdl },
    };

    Ok(f(devices))
}

fn argb_to_color(argb: u32) -> Color {
    let [a, r, g, b] = argb.to_be_bytes();
    Color::RGBA(r, g, b, a)
}

fn to_frect(rect: Rect) -> FRect {
    FRect::new(rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32)
}

// Swap axes to go from the panel's portrait frame to the landscape window
fn panel_to_window(rect: Rect) -> Rect {
    Rect::new(rect.y, rect.x, rect.height, rect.width)
}

fn texture_fits(texture_size: Option<(u32, u32)>, surface: &Surface) -> bool {
    texture_size == Some((surface.width(), surface.height()))
}

struct SizedTexture<'a> {
    texture: Texture<'a>,
    width: u32,
    height: u32,
}

pub struct SdlPresenter<'a> {
    canvas: WindowCanvas,
    texture_creator: &'a TextureCreator<WindowContext>,
    texture: Option<SizedTexture<'a>>,
    display: DisplaySize,
    background: Color,
    texture_bytes: Vec<u8>,
}

// Reuse the frame texture across posts, recreating it only if the surface size changes
fn frame_texture<'t, 'a>(
    slot: &'t mut Option<SizedTexture<'a>>,
    texture_creator: &'a TextureCreator<WindowContext>,
    surface: &Surface,
) -> SdlResult<&'t mut Texture<'a>> {
    let sized = match slot.take() {
        Some(sized) if texture_fits(Some((sized.width, sized.height)), surface) => sized,
        _ => {
            let texture = texture_creator
                .create_texture_streaming(PixelFormat::RGB565, surface.width(), surface.height())
                .map_err(|err| SdlError::CreateTexture(err.to_string()))?;
            log::debug!("Created {}x{} frame texture", surface.width(), surface.height());

            SizedTexture { texture, width: surface.width(), height: surface.height() }
        }
    };

    Ok(&mut slot.insert(sized).texture)
}

impl Presenter for SdlPresenter<'_> {
    type Err = SdlError;

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
        self.texture_bytes.clear();
        self.texture_bytes.extend_from_slice(bytemuck::cast_slice(surface.pixels()));

        let texture = frame_texture(&mut self.texture, self.texture_creator, surface)?;
        texture
            .update(None, &self.texture_bytes, 2 * surface.width() as usize)
            .map_err(|err| SdlError::UpdateTexture(err.to_string()))?;

        let window_dst = panel_to_window(dst);
        let angle = (rotation.degrees() + PANEL_TO_WINDOW_DEGREES) % 360;

        self.canvas.set_draw_color(self.background);
        self.canvas.clear();
        self.canvas
            .copy_ex(
                &*texture,
                to_frect(src),
                to_frect(window_dst),
                angle.into(),
                None::<FPoint>,
                false,
                false,
            )
            .map_err(SdlError::Render)?;
        self.canvas.present();

        Ok(())
    }
}

struct AudioCallbackState {
    queue: VecDeque<(f32, f32)>,
    error: Option<sdl3::Error>,
}

struct AudioQueueCallback {
    state: Arc<Mutex<AudioCallbackState>>,
}

impl AudioCallback<f32> for AudioQueueCallback {
    fn callback(&mut self, stream: &mut AudioStream, requested: i32) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let requested_stereo = (requested + 1) / 2;
        for _ in 0..requested_stereo {
            let Some((sample_l, sample_r)) = state.queue.pop_front() else { break };

            if let Err(err) = stream.put_data_f32(&[sample_l, sample_r]) {
                log::error!("Error pushing audio samples: {err}");
                state.error = Some(err);
                break;
            }
        }
    }
}

pub struct SdlAudioOutput {
    _stream: AudioStreamWithCallback<AudioQueueCallback>,
    state: Arc<Mutex<AudioCallbackState>>,
    sample_rate: u32,
    buffer_size: usize,
}

impl SdlAudioOutput {
    fn open(audio: &sdl3::AudioSubsystem, sample_rate: u32, buffer_size: u32) -> SdlResult<Self> {
        let state = Arc::new(Mutex::new(AudioCallbackState {
            queue: VecDeque::with_capacity(2 * buffer_size as usize),
            error: None,
        }));

        let stream = audio
            .open_playback_stream(
                &AudioSpec {
                    freq: Some(sample_rate as i32),
                    channels: Some(CHANNELS),
                    format: Some(AudioFormat::f32_sys()),
                },
                AudioQueueCallback { state: Arc::clone(&state) },
            )
            .map_err(SdlError::OpenStream)?;
        stream.resume().map_err(SdlError::OpenStream)?;

        Ok(Self { _stream: stream, state, sample_rate, buffer_size: buffer_size as usize })
    }
}

impl AudioOutput for SdlAudioOutput {
    type Err = SdlError;

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn submit(&mut self, samples: &[i16], frames: usize) -> Result<(), Self::Err> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(err) = state.error.take() {
            return Err(SdlError::QueueAudio(err));
        }

        if state.queue.len() > self.buffer_size {
            // Audio queue is full; drop samples
            log::debug!("Dropping {frames} audio frames because buffer is full");
            return Ok(());
        }

        state.queue.extend(samples.chunks_exact(2).map(|frame| {
            (f32::from(frame[0]) / 32768.0, f32::from(frame[1]) / 32768.0)
        }));

        Ok(())
    }
}

pub struct SdlGamepad {
    event_pump: EventPump,
    gamepad: Option<Gamepad>,
    quit_event: bool,
    // Dropped last
    _sdl: Sdl,
}

impl SdlGamepad {
    fn read_gamepad(gamepad: &Gamepad) -> GamepadState {
        let axis = |axis| f32::from(gamepad.axis(axis)) / 32768.0;

        GamepadState {
            dpad: Dpad {
                up: gamepad.button(Button::DPadUp),
                down: gamepad.button(Button::DPadDown),
                left: gamepad.button(Button::DPadLeft),
                right: gamepad.button(Button::DPadRight),
            },
            buttons: GamepadButtons {
                a: gamepad.button(Button::East),
                b: gamepad.button(Button::South),
                x: gamepad.button(Button::North),
                y: gamepad.button(Button::West),
                top_left: gamepad.button(Button::LeftShoulder),
                top_right: gamepad.button(Button::RightShoulder),
                f1: gamepad.button(Button::Guide),
                f2: false,
                f3: gamepad.button(Button::Start),
                f4: false,
                // Option buttons live on the shoulders of standard pads
                f5: gamepad.button(Button::LeftShoulder),
                f6: gamepad.button(Button::RightShoulder),
            },
            thumb: Thumbstick { x: axis(Axis::LeftX), y: axis(Axis::LeftY) },
        }
    }

    fn merge_keyboard(&self, state: &mut GamepadState) {
        let keyboard = self.event_pump.keyboard_state();
        let key = |scancode| keyboard.is_scancode_pressed(scancode);

        state.dpad.up |= key(Scancode::Up);
        state.dpad.down |= key(Scancode::Down);
        state.dpad.left |= key(Scancode::Left);
        state.dpad.right |= key(Scancode::Right);
        state.buttons.a |= key(Scancode::X);
        state.buttons.b |= key(Scancode::Z);
        state.buttons.f1 |= key(Scancode::Escape);
        state.buttons.f3 |= key(Scancode::Return);
        state.buttons.f5 |= key(Scancode::_1);
        state.buttons.f6 |= key(Scancode::_2);
    }
}

impl GamepadPoller for SdlGamepad {
    type Err = SdlError;

    fn poll(&mut self) -> Result<GamepadState, Self::Err> {
        for event in self.event_pump.poll_iter() {
            if let Event::Quit { .. } = event {
                self.quit_event = true;
            }
        }

        let mut state = self.gamepad.as_ref().map(Self::read_gamepad).unwrap_or_default();
        self.merge_keyboard(&mut state);
        state.buttons.f1 |= self.quit_event;

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_rect_maps_to_window() {
        // 480x320 landscape window, portrait panel rect covering it
        assert_eq!(panel_to_window(Rect::new(0, 0, 320, 480)), Rect::new(0, 0, 480, 320));
        assert_eq!(panel_to_window(Rect::new(0, 244, 200, 313)), Rect::new(244, 0, 313, 200));
    }

    #[test]
    fn texture_is_reused_while_surface_size_holds() {
        let surface = Surface::new(480, 306);

        assert!(texture_fits(Some((480, 306)), &surface));
        assert!(!texture_fits(Some((306, 480)), &surface));
        assert!(!texture_fits(None, &surface));
    }

    #[test]
    fn background_is_argb() {
        assert_eq!(argb_to_color(0xFF08_0808), Color::RGBA(8, 8, 8, 255));
    }
}
