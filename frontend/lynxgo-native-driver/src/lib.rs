pub mod config;
pub mod device;
pub mod headless;
mod mainloop;
#[cfg(feature = "sdl3")]
pub mod sdl;

pub use mainloop::{
    AudioBridge, AudioError, AudioResult, Devices, InputNormalizer, LoadOutcome, NormalizedInput,
    PresentationPipeline, SCALE, Session, SessionError, SessionFrameSink, SessionResult,
    SessionState, SessionSummary, StateError, StateResult, StopHandle, button_mask,
    destination_rect, dim_rgb565, fold_thumbstick, load_state, presentation_width, quit_requested,
    save_path_for, save_state, scale_frame,
};
