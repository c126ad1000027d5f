//! Deterministic test-card core
//!
//! Renders a scrolling view over the ROM bytes and a square-wave tone, one scanline per
//! `update()` call, with a Lynx-sized screen. It stands in for a real handheld core wherever the
//! driver needs something to drive.

mod api;
mod audio;
mod video;

pub use api::{
    AUDIO_SAMPLE_RATE, CONTEXT_LEN, LINES_PER_FRAME, SCREEN_HEIGHT, SCREEN_WIDTH, TestcardCore,
    TestcardError,
};
