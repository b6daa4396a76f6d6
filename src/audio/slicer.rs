use anyhow::{bail, Context, Result};
use std::io::Cursor;
use tracing::debug;

use super::backend::AudioFrame;

/// Slice configuration
#[derive(Debug, Clone)]
pub struct SliceConfig {
    /// Duration of each slice in milliseconds (default: 250)
    pub slice_ms: u64,
    /// Output sample rate of every slice
    pub sample_rate: u32,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            slice_ms: 250,
            sample_rate: 44100,
        }
    }
}

impl SliceConfig {
    /// Mono samples in one full slice
    pub fn samples_per_slice(&self) -> usize {
        ((self.sample_rate as u64 * self.slice_ms / 1000) as usize).max(1)
    }
}

/// One fixed-duration slice of audio packaged as a WAV file
#[derive(Debug, Clone)]
pub struct AudioSlice {
    /// Slice number within the recording (0-indexed)
    pub index: usize,
    /// Start of the slice in milliseconds of emitted audio
    pub start_ms: u64,
    /// End of the slice in milliseconds of emitted audio
    pub end_ms: u64,
    /// Number of mono samples in this slice
    pub sample_count: usize,
    /// WAV container bytes (16-bit PCM mono)
    pub bytes: Vec<u8>,
}

/// Cuts a stream of capture frames into fixed-duration mono WAV slices
///
/// Frames are downmixed to mono and resampled to the configured rate before
/// being accumulated.
pub struct AudioSlicer {
    config: SliceConfig,
    pending: Vec<i16>,
    resampler: Option<LinearResampler>,
    slice_index: usize,
    emitted_samples: u64,
}

impl AudioSlicer {
    pub fn new(config: SliceConfig) -> Self {
        debug!(
            "Audio slicer initialized: {}ms slices at {}Hz ({} samples)",
            config.slice_ms,
            config.sample_rate,
            config.samples_per_slice()
        );

        Self {
            pending: Vec::with_capacity(config.samples_per_slice()),
            config,
            resampler: None,
            slice_index: 0,
            emitted_samples: 0,
        }
    }

    /// Feed one frame; returns every slice that became complete
    pub fn push(&mut self, frame: &AudioFrame) -> Result<Vec<AudioSlice>> {
        if self.config.sample_rate == 0 || self.config.slice_ms == 0 {
            bail!(
                "Invalid slice config: {}ms at {}Hz",
                self.config.slice_ms,
                self.config.sample_rate
            );
        }
        if frame.sample_rate == 0 || frame.channels == 0 {
            bail!(
                "Invalid audio frame: {}Hz, {} channels",
                frame.sample_rate,
                frame.channels
            );
        }

        let mono = downmix_to_mono(&frame.samples, frame.channels);

        if self.resampler.as_ref().map(|r| r.input_rate) != Some(frame.sample_rate) {
            self.resampler = Some(LinearResampler::new(frame.sample_rate, self.config.sample_rate));
        }
        let converted = match self.resampler.as_mut() {
            Some(resampler) => resampler.process(&mono),
            None => mono,
        };
        self.pending.extend_from_slice(&converted);

        let per_slice = self.config.samples_per_slice();
        let mut slices = Vec::new();
        while self.pending.len() >= per_slice {
            let samples: Vec<i16> = self.pending.drain(..per_slice).collect();
            slices.push(self.package(&samples)?);
        }

        Ok(slices)
    }

    /// Package whatever is buffered as a short final slice
    pub fn flush(&mut self) -> Result<Option<AudioSlice>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let samples = std::mem::take(&mut self.pending);
        self.package(&samples).map(Some)
    }

    /// Samples waiting for the next slice
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    fn package(&mut self, samples: &[i16]) -> Result<AudioSlice> {
        let rate = self.config.sample_rate as u64;
        let start_ms = self.emitted_samples * 1000 / rate;
        self.emitted_samples += samples.len() as u64;
        let end_ms = self.emitted_samples * 1000 / rate;

        let slice = AudioSlice {
            index: self.slice_index,
            start_ms,
            end_ms,
            sample_count: samples.len(),
            bytes: encode_wav(samples, self.config.sample_rate)?,
        };
        self.slice_index += 1;

        Ok(slice)
    }
}

/// Encode mono 16-bit PCM into an in-memory WAV file
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV slice")?;
    }

    Ok(cursor.into_inner())
}

/// Average interleaved channels into a single channel
fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Streaming linear-interpolation resampler
///
/// Carries the last input sample and the fractional read position across
/// calls so frame boundaries stay continuous.
struct LinearResampler {
    input_rate: u32,
    output_rate: u32,
    step: f64,
    position: f64,
    last: Option<i16>,
}

impl LinearResampler {
    fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            input_rate,
            output_rate,
            step: input_rate as f64 / output_rate.max(1) as f64,
            position: 0.0,
            last: None,
        }
    }

    fn process(&mut self, input: &[i16]) -> Vec<i16> {
        if self.input_rate == self.output_rate || input.is_empty() {
            return input.to_vec();
        }

        let mut buf = Vec::with_capacity(input.len() + 1);
        buf.extend(self.last);
        buf.extend_from_slice(input);

        let mut output = Vec::with_capacity((input.len() as f64 / self.step) as usize + 1);
        loop {
            let index = self.position.floor() as usize;
            if index + 1 >= buf.len() {
                break;
            }
            let frac = self.position - index as f64;
            let a = buf[index] as f64;
            let b = buf[index + 1] as f64;
            output.push((a + (b - a) * frac).round() as i16);
            self.position += self.step;
        }

        self.position -= (buf.len() - 1) as f64;
        self.last = buf.last().copied();

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>, sample_rate: u32, channels: u16) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate,
            channels,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_downmix_stereo_averages() {
        let mono = downmix_to_mono(&[100, 300, -200, 200], 2);
        assert_eq!(mono, vec![200, 0]);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        assert_eq!(downmix_to_mono(&[1, 2, 3], 1), vec![1, 2, 3]);
    }

    #[test]
    fn test_resampler_same_rate_passthrough() {
        let mut r = LinearResampler::new(44100, 44100);
        assert_eq!(r.process(&[5, 6, 7]), vec![5, 6, 7]);
    }

    #[test]
    fn test_resampler_halves_rate() {
        let mut r = LinearResampler::new(88200, 44100);
        let out = r.process(&[0, 10, 20, 30, 40, 50]);
        assert_eq!(out, vec![0, 20, 40]);
    }

    #[test]
    fn test_resampler_output_length_across_calls() {
        // 48 kHz -> 44.1 kHz over one second, fed in 10 ms frames
        let mut r = LinearResampler::new(48000, 44100);
        let mut total = 0;
        for _ in 0..100 {
            total += r.process(&[1000i16; 480]).len();
        }
        assert!((44090..=44110).contains(&total), "got {} samples", total);
    }

    #[test]
    fn test_slicer_emits_full_slices() {
        let mut slicer = AudioSlicer::new(SliceConfig::default());
        // 600 ms of 44.1 kHz mono in 100 ms frames
        let mut slices = Vec::new();
        for _ in 0..6 {
            slices.extend(slicer.push(&frame(vec![7; 4410], 44100, 1)).unwrap());
        }

        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].index, 0);
        assert_eq!(slices[0].sample_count, 11025);
        assert_eq!(slices[0].start_ms, 0);
        assert_eq!(slices[0].end_ms, 250);
        assert_eq!(slices[1].start_ms, 250);
        assert_eq!(slicer.pending_samples(), 26460 - 22050);
    }

    #[test]
    fn test_flush_packages_remainder() {
        let mut slicer = AudioSlicer::new(SliceConfig::default());
        assert!(slicer.push(&frame(vec![1; 1000], 44100, 1)).unwrap().is_empty());

        let tail = slicer.flush().unwrap().expect("remainder slice");
        assert_eq!(tail.sample_count, 1000);
        assert!(slicer.flush().unwrap().is_none());
    }

    #[test]
    fn test_zero_rate_frame_is_rejected() {
        let mut slicer = AudioSlicer::new(SliceConfig::default());
        assert!(slicer.push(&frame(vec![1; 441], 0, 1)).is_err());
        assert!(slicer.push(&frame(vec![1; 441], 44100, 0)).is_err());
        assert_eq!(slicer.pending_samples(), 0);

        // A bad frame does not poison the slicer
        assert!(slicer.push(&frame(vec![1; 441], 44100, 1)).is_ok());
        assert_eq!(slicer.pending_samples(), 441);
    }

    #[test]
    fn test_zero_output_rate_is_rejected() {
        let mut slicer = AudioSlicer::new(SliceConfig {
            slice_ms: 250,
            sample_rate: 0,
        });
        assert!(slicer.push(&frame(vec![1; 4410], 44100, 1)).is_err());

        let mut slicer = AudioSlicer::new(SliceConfig {
            slice_ms: 0,
            sample_rate: 44100,
        });
        assert!(slicer.push(&frame(vec![1; 4410], 44100, 1)).is_err());
    }

    #[test]
    fn test_wav_header_size() {
        let bytes = encode_wav(&[0i16; 100], 44100).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + 200);
    }
}
