use crate::device::AudioOutput;
use crate::mainloop::audio::AudioBridge;
use lynxgo_common::frontend::{AudioBuffer, FrameSink, FrameSize};

/// Owns the frame buffer the core renders into and receives its end-of-frame callback.
pub struct SessionFrameSink<A> {
    frame_buffer: Vec<u16>,
    stride: usize,
    frame_ready: bool,
    audio: AudioBridge<A>,
    dropped_audio_blocks: u64,
}

impl<A: AudioOutput> SessionFrameSink<A> {
    pub fn new(frame_size: FrameSize, audio: AudioBridge<A>) -> Self {
        let stride = frame_size.width as usize;
        Self {
            frame_buffer: vec![0; stride * frame_size.height as usize],
            stride,
            frame_ready: false,
            audio,
            dropped_audio_blocks: 0,
        }
    }

    /// Returns whether a frame completed since the last call, and clears the flag.
    pub fn take_frame_ready(&mut self) -> bool {
        let ready = self.frame_ready;
        self.frame_ready = false;
        ready
    }

    pub fn frame(&self) -> &[u16] {
        &self.frame_buffer
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn audio(&self) -> &AudioBridge<A> {
        &self.audio
    }

    pub fn dropped_audio_blocks(&self) -> u64 {
        self.dropped_audio_blocks
    }
}

impl<A: AudioOutput> FrameSink for SessionFrameSink<A> {
    fn frame_buffer(&mut self) -> &mut [u16] {
        &mut self.frame_buffer
    }

    fn frame_complete(&mut self, audio: &mut AudioBuffer) {
        if !audio.is_empty() {
            if let Err(err) = self.audio.submit(audio.samples()) {
                log::warn!("Dropping {} audio frames: {err}", audio.pending_frames());
                self.dropped_audio_blocks += 1;
            }
            audio.clear();
        }

        self.frame_ready = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessAudio;

    fn new_sink() -> SessionFrameSink<HeadlessAudio> {
        let bridge = AudioBridge::new(HeadlessAudio::new(48000), 48000).unwrap();
        SessionFrameSink::new(FrameSize { width: 4, height: 2 }, bridge)
    }

    #[test]
    fn frame_buffer_covers_stride_times_height() {
        let mut sink = new_sink();
        assert_eq!(sink.frame_buffer().len(), 8);
        assert_eq!(sink.stride(), 4);
    }

    #[test]
    fn frame_complete_forwards_and_clears_audio() {
        let mut sink = new_sink();
        let mut audio = AudioBuffer::with_capacity(2);
        audio.push_frame(10, -10);
        audio.push_frame(20, -20);

        sink.frame_complete(&mut audio);

        assert!(audio.is_empty());
        assert_eq!(sink.audio().output().frames_submitted(), 2);
        assert!(sink.take_frame_ready());
        assert!(!sink.take_frame_ready());
    }

    #[test]
    fn empty_audio_is_not_submitted() {
        let mut sink = new_sink();
        sink.frame_complete(&mut AudioBuffer::default());

        assert_eq!(sink.audio().output().submissions(), 0);
        assert!(sink.take_frame_ready());
    }

    #[test_log::test]
    fn rejected_audio_is_dropped() {
        let bridge = AudioBridge::new(HeadlessAudio::failing(48000), 48000).unwrap();
        let mut sink = SessionFrameSink::new(FrameSize { width: 1, height: 1 }, bridge);
        let mut audio = AudioBuffer::with_capacity(1);
        audio.push_frame(1, 1);

        sink.frame_complete(&mut audio);

        assert!(audio.is_empty());
        assert_eq!(sink.dropped_audio_blocks(), 1);
        assert!(sink.take_frame_ready());
    }
}
