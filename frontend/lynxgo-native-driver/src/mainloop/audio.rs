use crate::device::AudioOutput;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio device opened at {device} Hz but the core produces {core} Hz")]
    SampleRateMismatch { device: u32, core: u32 },
    #[error("Audio block has an odd number of samples ({0}); expected interleaved stereo")]
    OddSampleCount(usize),
    #[error("Error submitting audio samples: {0}")]
    Device(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

pub type AudioResult<T> = Result<T, AudioError>;

/// Forwards the core's stereo blocks to the audio device at the core's native rate.
pub struct AudioBridge<A> {
    output: A,
    submissions: u64,
}

impl<A: AudioOutput> AudioBridge<A> {
    /// # Errors
    ///
    /// Returns an error if `output` does not play at `sample_rate`; samples are never resampled.
    pub fn new(output: A, sample_rate: u32) -> AudioResult<Self> {
        let device_rate = output.sample_rate();
        if device_rate != sample_rate {
            return Err(AudioError::SampleRateMismatch { device: device_rate, core: sample_rate });
        }

        log::info!("Sound: sample rate={sample_rate}");

        Ok(Self { output, submissions: 0 })
    }

    /// # Errors
    ///
    /// Propagates device errors. The block is not retried.
    pub fn submit(&mut self, samples: &[i16]) -> AudioResult<()> {
        if samples.len() % 2 != 0 {
            return Err(AudioError::OddSampleCount(samples.len()));
        }

        let frames = samples.len() / 2;
        self.output.submit(samples, frames).map_err(|err| AudioError::Device(err.into()))?;
        self.submissions += 1;

        Ok(())
    }

    /// Number of blocks the device accepted.
    #[must_use]
    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    pub fn output(&self) -> &A {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessAudio;

    #[test]
    fn rejects_mismatched_rate() {
        let result = AudioBridge::new(HeadlessAudio::new(44100), 48000);
        assert!(matches!(
            result,
            Err(AudioError::SampleRateMismatch { device: 44100, core: 48000 })
        ));
    }

    #[test]
    fn frame_count_is_half_sample_count() {
        let mut bridge = AudioBridge::new(HeadlessAudio::new(48000), 48000).unwrap();
        bridge.submit(&[1, 2, 3, 4, 5, 6]).unwrap();

        assert_eq!(bridge.output().frames_submitted(), 3);
        assert_eq!(bridge.output().submissions(), 1);
        assert_eq!(bridge.submissions(), 1);
    }

    #[test]
    fn odd_block_is_rejected() {
        let mut bridge = AudioBridge::new(HeadlessAudio::new(48000), 48000).unwrap();
        assert!(matches!(bridge.submit(&[1, 2, 3]), Err(AudioError::OddSampleCount(3))));
        assert_eq!(bridge.output().submissions(), 0);
    }
}
