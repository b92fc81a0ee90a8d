use std::path::Path;

use voxscribe_core::{AudioError, AudioPart};

pub trait AudioChunker: Send + Sync {
    /// Split the recording at `path` into parts of at most `max_chunk_sec`
    /// seconds. Parts are returned in order, contiguous and gap-free, with
    /// `offset_sec` measured from the start of the recording.
    fn split(&self, path: &Path, max_chunk_sec: f64) -> Result<Vec<AudioPart>, AudioError>;
}

/// Decodes a WAV file to mono f32 and slices it into fixed-length parts.
/// Multi-channel input is mean-downmixed; integer samples are normalized
/// to [-1.0, 1.0].
pub struct WavChunker;

impl WavChunker {
    fn decode_mono(path: &Path) -> Result<(Vec<f32>, u32), AudioError> {
        let mut reader = hound::WavReader::open(path).map_err(|e| AudioError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AudioError::DecodeFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| AudioError::DecodeFailed {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })?
            }
        };

        if interleaved.is_empty() {
            return Err(AudioError::EmptyAudio {
                path: path.to_path_buf(),
            });
        }

        let channels = spec.channels.max(1) as usize;
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        Ok((samples, spec.sample_rate))
    }
}

impl AudioChunker for WavChunker {
    fn split(&self, path: &Path, max_chunk_sec: f64) -> Result<Vec<AudioPart>, AudioError> {
        let (samples, sample_rate) = Self::decode_mono(path)?;

        let max_samples = ((max_chunk_sec * sample_rate as f64).floor() as usize).max(1);
        let mut parts = Vec::with_capacity(samples.len() / max_samples + 1);
        let mut start = 0usize;
        while start < samples.len() {
            let end = (start + max_samples).min(samples.len());
            parts.push(AudioPart {
                samples: samples[start..end].to_vec(),
                sample_rate,
                offset_sec: start as f64 / sample_rate as f64,
            });
            start = end;
        }

        tracing::debug!(
            path = %path.display(),
            num_parts = parts.len(),
            sample_rate,
            "split audio into parts"
        );
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav_i16(path: &Path, channels: u16, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            for _ in 0..channels {
                writer.write_sample((i % 128) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_split_short_audio_single_part() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.wav");
        write_wav_i16(&path, 1, 16_000, 16_000); // 1 second

        let parts = WavChunker.split(&path, 60.0).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].offset_sec, 0.0);
        assert_eq!(parts[0].samples.len(), 16_000);
        assert!((parts[0].duration_sec() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_long_audio_contiguous_parts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.wav");
        write_wav_i16(&path, 1, 8_000, 5 * 8_000); // 5 seconds

        let parts = WavChunker.split(&path, 2.0).unwrap();
        assert_eq!(parts.len(), 3); // 2s + 2s + 1s tail
        assert_eq!(parts[0].samples.len(), 16_000);
        assert_eq!(parts[2].samples.len(), 8_000);

        // Each part starts where the previous one ended.
        let mut expected_offset = 0.0;
        for part in &parts {
            assert!((part.offset_sec - expected_offset).abs() < 1e-9);
            expected_offset += part.duration_sec();
        }
        assert!((expected_offset - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_covers_all_samples_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.wav");
        write_wav_i16(&path, 1, 1_000, 3_500);

        let parts = WavChunker.split(&path, 1.0).unwrap();
        let total: usize = parts.iter().map(|p| p.samples.len()).sum();
        assert_eq!(total, 3_500);
        assert_eq!(parts.len(), 4);
    }

    #[test]
    fn test_stereo_downmixed_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav_i16(&path, 2, 16_000, 16_000);

        let parts = WavChunker.split(&path, 60.0).unwrap();
        assert_eq!(parts.len(), 1);
        // 16_000 frames, not 32_000 interleaved samples.
        assert_eq!(parts[0].samples.len(), 16_000);
    }

    #[test]
    fn test_int_samples_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("norm.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(i16::MIN).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.write_sample(i16::MAX).unwrap();
        writer.finalize().unwrap();

        let parts = WavChunker.split(&path, 60.0).unwrap();
        let samples = &parts[0].samples;
        assert!((samples[0] + 1.0).abs() < 1e-6);
        assert_eq!(samples[1], 0.0);
        assert!(samples[2] < 1.0 && samples[2] > 0.99);
    }

    #[test]
    fn test_empty_wav_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_wav_i16(&path, 1, 16_000, 0);

        let result = WavChunker.split(&path, 60.0);
        assert!(matches!(result, Err(AudioError::EmptyAudio { .. })));
    }

    #[test]
    fn test_missing_file_rejected() {
        let result = WavChunker.split(Path::new("/nonexistent/x.wav"), 60.0);
        assert!(matches!(result, Err(AudioError::OpenFailed { .. })));
    }
}
