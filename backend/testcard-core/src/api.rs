//! Test-card core public interface and main loop

use crate::audio::ToneGenerator;
use crate::video::{LineParams, render_line};
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};
use crc::Crc;
use lynxgo_common::context::ContextCursor;
use lynxgo_common::frontend::{
    AudioBuffer, DisplayAttributes, EmulatorCore, FrameSink, PixelFormat, ScreenRotation,
};
use lynxgo_common::input::{Button, LogicalButtons};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const SCREEN_WIDTH: u32 = 160;
pub const SCREEN_HEIGHT: u32 = 102;
pub const AUDIO_SAMPLE_RATE: u32 = 48000;

/// Visible lines plus vertical blank
pub const LINES_PER_FRAME: u32 = 105;
const FRAMES_PER_SECOND: u32 = 75;
const SAMPLES_PER_FRAME: u32 = AUDIO_SAMPLE_RATE / FRAMES_PER_SECOND;

const CONTEXT_MAGIC: [u8; 4] = *b"TCRD";

/// Size of a serialized context in bytes
pub const CONTEXT_LEN: usize = 40;

const CRC: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

macro_rules! bincode_config {
    () => {
        bincode::config::standard().with_little_endian().with_fixed_int_encoding()
    };
}

#[derive(Debug, Error)]
pub enum TestcardError {
    #[error("Error reading ROM file '{path}': {source}")]
    RomRead {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("ROM image is empty")]
    EmptyRom,
    #[error("BIOS emulation is disabled and no BIOS path was provided")]
    NoBios,
    #[error("Error reading BIOS file '{path}': {source}")]
    BiosRead {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Frame buffer holds {len} pixels, at least {required} required for stride {stride}")]
    FrameBufferLen { len: usize, required: usize, stride: usize },
    #[error("Error encoding context: {0}")]
    ContextEncode(#[from] EncodeError),
    #[error("Error decoding context: {0}")]
    ContextDecode(#[from] DecodeError),
    #[error("Context does not begin with the test-card signature")]
    ContextSignature,
    #[error("Context was saved for a different ROM; expected CRC {expected:08X}, got {actual:08X}")]
    ContextRomMismatch { expected: u32, actual: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
struct CoreState {
    magic: [u8; 4],
    rom_crc: u32,
    frame_count: u64,
    line: u32,
    scroll_x: u32,
    scroll_y: u32,
    buttons: u16,
    paused: bool,
    pause_held: bool,
    tone: ToneGenerator,
}

impl CoreState {
    fn new(rom_crc: u32) -> Self {
        Self {
            magic: CONTEXT_MAGIC,
            rom_crc,
            frame_count: 0,
            line: 0,
            scroll_x: 0,
            scroll_y: 0,
            buttons: 0,
            paused: false,
            pause_held: false,
            tone: ToneGenerator::default(),
        }
    }
}

#[derive(Debug)]
pub struct TestcardCore {
    rom: Box<[u8]>,
    attributes: DisplayAttributes,
    audio: AudioBuffer,
    state: CoreState,
}

impl TestcardCore {
    /// Load the ROM at `rom_path`.
    ///
    /// `bios_path` is only read when `emulate_bios` is false; an empty path then is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM or a required BIOS cannot be read, or if the ROM is empty.
    pub fn open(
        rom_path: &Path,
        bios_path: &Path,
        emulate_bios: bool,
    ) -> Result<Self, TestcardError> {
        if !emulate_bios {
            if bios_path.as_os_str().is_empty() {
                return Err(TestcardError::NoBios);
            }

            let bios = fs::read(bios_path).map_err(|source| TestcardError::BiosRead {
                path: bios_path.display().to_string(),
                source,
            })?;
            log::info!("Loaded {}-byte BIOS from '{}'", bios.len(), bios_path.display());
        }

        let rom = fs::read(rom_path).map_err(|source| TestcardError::RomRead {
            path: rom_path.display().to_string(),
            source,
        })?;

        Self::from_rom(rom)
    }

    /// # Errors
    ///
    /// Returns an error if the ROM is empty.
    pub fn from_rom(rom: Vec<u8>) -> Result<Self, TestcardError> {
        if rom.is_empty() {
            return Err(TestcardError::EmptyRom);
        }

        let rom_crc = CRC.checksum(&rom);
        log::info!("Test-card core loaded {}-byte ROM with CRC {rom_crc:08X}", rom.len());

        Ok(Self {
            rom: rom.into_boxed_slice(),
            attributes: DisplayAttributes {
                rotation: ScreenRotation::None,
                pixel_format: PixelFormat::Rgb565,
                stride: SCREEN_WIDTH as usize,
            },
            audio: AudioBuffer::with_capacity(2 * SAMPLES_PER_FRAME as usize),
            state: CoreState::new(rom_crc),
        })
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.state.frame_count
    }

    fn held(&self, button: Button) -> bool {
        LogicalButtons::from_bits(self.state.buttons).contains(button)
    }

    fn voices(&self) -> u32 {
        [Button::B, Button::Left, Button::Right, Button::Up, Button::Down]
            .into_iter()
            .filter(|&button| self.held(button))
            .count() as u32
    }

    fn generate_line_audio(&mut self) {
        let count = self.state.tone.samples_for_line(SAMPLES_PER_FRAME, LINES_PER_FRAME);
        let voices = self.voices();
        for _ in 0..count {
            let sample = self.state.tone.next_sample(voices, AUDIO_SAMPLE_RATE);
            self.audio.push_frame(sample, sample);
        }
    }

    fn end_frame(&mut self) {
        self.state.frame_count += 1;

        let pause_held = self.held(Button::Pause);
        if pause_held && !self.state.pause_held {
            self.state.paused = !self.state.paused;
        }
        self.state.pause_held = pause_held;

        if self.state.paused {
            return;
        }

        let width = self.rom.len() as u32;
        if self.held(Button::Left) {
            self.state.scroll_x = self.state.scroll_x.checked_sub(1).unwrap_or(width - 1);
        }
        if self.held(Button::Right) {
            self.state.scroll_x = (self.state.scroll_x + 1) % width;
        }
        if self.held(Button::Up) {
            self.state.scroll_y = self.state.scroll_y.checked_sub(1).unwrap_or(width - 1);
        }
        if self.held(Button::Down) {
            self.state.scroll_y = (self.state.scroll_y + 1) % width;
        }
    }
}

impl EmulatorCore for TestcardCore {
    type Err = TestcardError;

    const SCREEN_WIDTH: u32 = SCREEN_WIDTH;
    const SCREEN_HEIGHT: u32 = SCREEN_HEIGHT;
    const AUDIO_SAMPLE_RATE: u32 = AUDIO_SAMPLE_RATE;

    fn display_set_attributes(&mut self, attributes: DisplayAttributes) {
        if attributes.rotation != ScreenRotation::None {
            log::warn!("Test-card core does not rotate output; ignoring {:?}", attributes.rotation);
        }

        self.attributes = attributes;
    }

    fn set_button_data(&mut self, buttons: LogicalButtons) {
        self.state.buttons = buttons.bits();
    }

    fn update<S: FrameSink>(&mut self, sink: &mut S) -> Result<(), Self::Err> {
        let line = self.state.line;

        if line < SCREEN_HEIGHT {
            let stride = self.attributes.stride;
            let frame_buffer = sink.frame_buffer();
            let required = stride * (SCREEN_HEIGHT as usize - 1) + SCREEN_WIDTH as usize;
            if stride < SCREEN_WIDTH as usize || frame_buffer.len() < required {
                return Err(TestcardError::FrameBufferLen {
                    len: frame_buffer.len(),
                    required,
                    stride,
                });
            }

            let params = LineParams {
                scroll_x: self.state.scroll_x,
                scroll_y: self.state.scroll_y,
                inverted: self.held(Button::A),
                pixel_format: self.attributes.pixel_format,
            };
            let start = line as usize * stride;
            let end = start + SCREEN_WIDTH as usize;
            render_line(&self.rom, line, params, &mut frame_buffer[start..end]);
        }

        self.generate_line_audio();

        if line == SCREEN_HEIGHT - 1 {
            sink.frame_complete(&mut self.audio);
            self.end_frame();
        }

        self.state.line = (line + 1) % LINES_PER_FRAME;

        Ok(())
    }

    fn context_size(&self) -> usize {
        CONTEXT_LEN
    }

    fn context_save(&self, cursor: &mut ContextCursor<'_>) -> Result<(), Self::Err> {
        bincode::encode_into_std_write(&self.state, cursor, bincode_config!())?;
        Ok(())
    }

    fn context_load(&mut self, cursor: &mut ContextCursor<'_>) -> Result<(), Self::Err> {
        let state: CoreState = bincode::decode_from_std_read(cursor, bincode_config!())?;

        if state.magic != CONTEXT_MAGIC {
            return Err(TestcardError::ContextSignature);
        }

        if state.rom_crc != self.state.rom_crc {
            return Err(TestcardError::ContextRomMismatch {
                expected: self.state.rom_crc,
                actual: state.rom_crc,
            });
        }

        self.state = state;
        // Samples from before the load belong to a frame that no longer exists
        self.audio.clear();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    struct VecSink {
        frame_buffer: Vec<u16>,
        frames: u32,
        audio_frames: usize,
    }

    impl VecSink {
        fn new(len: usize) -> Self {
            Self { frame_buffer: vec![0; len], frames: 0, audio_frames: 0 }
        }
    }

    impl FrameSink for VecSink {
        fn frame_buffer(&mut self) -> &mut [u16] {
            &mut self.frame_buffer
        }

        fn frame_complete(&mut self, audio: &mut AudioBuffer) {
            self.frames += 1;
            self.audio_frames += audio.pending_frames();
            audio.clear();
        }
    }

    fn test_rom() -> Vec<u8> {
        (0..=255).collect()
    }

    fn run_frame(core: &mut TestcardCore, sink: &mut VecSink) {
        let frames = sink.frames;
        while sink.frames == frames {
            core.update(sink).unwrap();
        }
    }

    #[test]
    fn context_len_matches_encoding() {
        let core = TestcardCore::from_rom(test_rom()).unwrap();
        let encoded = bincode::encode_to_vec(&core.state, bincode_config!()).unwrap();
        assert_eq!(encoded.len(), CONTEXT_LEN);
        assert_eq!(core.context_size(), CONTEXT_LEN);
    }

    #[test]
    fn one_callback_per_frame() {
        let mut core = TestcardCore::from_rom(test_rom()).unwrap();
        let mut sink = VecSink::new((SCREEN_WIDTH * SCREEN_HEIGHT) as usize);

        for _ in 0..3 * LINES_PER_FRAME {
            core.update(&mut sink).unwrap();
        }

        assert_eq!(sink.frames, 3);
        assert_eq!(core.frame_count(), 3);
    }

    #[test]
    fn first_frame_audio_covers_visible_lines() {
        let mut core = TestcardCore::from_rom(test_rom()).unwrap();
        let mut sink = VecSink::new((SCREEN_WIDTH * SCREEN_HEIGHT) as usize);

        run_frame(&mut core, &mut sink);
        assert!(sink.audio_frames > 0);
        assert!(sink.audio_frames <= SAMPLES_PER_FRAME as usize);
    }

    #[test]
    fn rejects_short_frame_buffer() {
        let mut core = TestcardCore::from_rom(test_rom()).unwrap();
        let mut sink = VecSink::new(10);

        assert!(matches!(core.update(&mut sink), Err(TestcardError::FrameBufferLen { .. })));
    }

    #[test]
    fn honors_stride() {
        let stride = SCREEN_WIDTH as usize + 16;
        let mut core = TestcardCore::from_rom(test_rom()).unwrap();
        core.display_set_attributes(DisplayAttributes {
            rotation: ScreenRotation::None,
            pixel_format: PixelFormat::Rgb565,
            stride,
        });
        let mut sink = VecSink::new(stride * SCREEN_HEIGHT as usize);
        sink.frame_buffer.fill(0xDEAD);

        run_frame(&mut core, &mut sink);

        // Padding at the end of each row is untouched
        for row in sink.frame_buffer.chunks(stride) {
            assert!(row[SCREEN_WIDTH as usize..].iter().all(|&pixel| pixel == 0xDEAD));
        }
    }

    #[test]
    fn directions_scroll_the_view() {
        let mut core = TestcardCore::from_rom(test_rom()).unwrap();
        let mut sink = VecSink::new((SCREEN_WIDTH * SCREEN_HEIGHT) as usize);

        core.set_button_data(Button::Right.into());
        run_frame(&mut core, &mut sink);
        assert_eq!(core.state.scroll_x, 1);

        core.set_button_data(LogicalButtons::NONE | Button::Left);
        run_frame(&mut core, &mut sink);
        run_frame(&mut core, &mut sink);
        assert_eq!(core.state.scroll_x, 255);
    }

    #[test]
    fn pause_toggles_on_press() {
        let mut core = TestcardCore::from_rom(test_rom()).unwrap();
        let mut sink = VecSink::new((SCREEN_WIDTH * SCREEN_HEIGHT) as usize);

        core.set_button_data(LogicalButtons::NONE | Button::Pause | Button::Down);
        run_frame(&mut core, &mut sink);
        run_frame(&mut core, &mut sink);
        assert!(core.state.paused);
        assert_eq!(core.state.scroll_y, 0);

        core.set_button_data(Button::Down.into());
        run_frame(&mut core, &mut sink);
        assert_eq!(core.state.scroll_y, 0);
    }

    #[test]
    fn context_round_trip() {
        let mut core = TestcardCore::from_rom(test_rom()).unwrap();
        let mut sink = VecSink::new((SCREEN_WIDTH * SCREEN_HEIGHT) as usize);
        core.set_button_data(LogicalButtons::NONE | Button::Down | Button::B);
        for _ in 0..5 {
            run_frame(&mut core, &mut sink);
        }

        let mut saved = vec![0; core.context_size()];
        core.context_save(&mut ContextCursor::new(&mut saved)).unwrap();

        let mut restored = TestcardCore::from_rom(test_rom()).unwrap();
        restored.context_load(&mut ContextCursor::new(&mut saved.clone())).unwrap();
        assert_eq!(restored.state, core.state);

        let mut resaved = vec![0; restored.context_size()];
        restored.context_save(&mut ContextCursor::new(&mut resaved)).unwrap();
        assert_eq!(saved, resaved);
    }

    #[test]
    fn context_from_other_rom_is_rejected() {
        let core = TestcardCore::from_rom(test_rom()).unwrap();
        let mut saved = vec![0; core.context_size()];
        core.context_save(&mut ContextCursor::new(&mut saved)).unwrap();

        let mut other = TestcardCore::from_rom(vec![1, 2, 3]).unwrap();
        let result = other.context_load(&mut ContextCursor::new(&mut saved));
        assert!(matches!(result, Err(TestcardError::ContextRomMismatch { .. })));
    }

    #[test]
    fn context_save_into_short_cursor_fails() {
        let core = TestcardCore::from_rom(test_rom()).unwrap();
        let mut saved = vec![0; CONTEXT_LEN - 1];
        let result = core.context_save(&mut ContextCursor::new(&mut saved));
        assert!(matches!(result, Err(TestcardError::ContextEncode(_))));
    }

    #[test]
    fn empty_rom_is_rejected() {
        assert!(matches!(TestcardCore::from_rom(vec![]), Err(TestcardError::EmptyRom)));
    }

    #[test]
    fn missing_bios_is_rejected_without_emulation() {
        let result = TestcardCore::open(Path::new("rom.lnx"), Path::new(""), false);
        assert!(matches!(result, Err(TestcardError::NoBios)));
    }
}
