use bincode::{Decode, Encode};

const AMPLITUDE: i16 = 2048;
const BASE_FREQUENCY: u32 = 220;

#[derive(Debug, Clone, PartialEq, Eq, Default, Encode, Decode)]
pub(crate) struct ToneGenerator {
    phase: u32,
    sample_remainder: u32,
}

impl ToneGenerator {
    /// Number of samples to produce for the next scanline so that every frame averages
    /// `samples_per_frame / lines_per_frame` samples per line.
    pub(crate) fn samples_for_line(&mut self, samples_per_frame: u32, lines_per_frame: u32) -> u32 {
        self.sample_remainder += samples_per_frame;
        let count = self.sample_remainder / lines_per_frame;
        self.sample_remainder %= lines_per_frame;
        count
    }

    /// Square wave at `BASE_FREQUENCY * voices`; `voices == 0` produces silence.
    pub(crate) fn next_sample(&mut self, voices: u32, sample_rate: u32) -> i16 {
        if voices == 0 {
            self.phase = 0;
            return 0;
        }

        self.phase = (self.phase + BASE_FREQUENCY * voices) % sample_rate;
        if self.phase < sample_rate / 2 { AMPLITUDE } else { -AMPLITUDE }
    }
}
