use std::path::{Path, PathBuf};
use std::process::Command;

use voxscribe_core::AudioError;

/// Env var overriding the `ffprobe` binary, for bundled installs.
pub const FFPROBE_ENV: &str = "VOXSCRIBE_FFPROBE";

pub trait DurationProbe: Send + Sync {
    fn duration_seconds(&self, path: &Path) -> Result<f64, AudioError>;
}

/// Probes duration by shelling out to `ffprobe`, so any container format
/// ffmpeg understands is accepted.
pub struct FfprobeDurationProbe {
    binary: PathBuf,
}

impl FfprobeDurationProbe {
    pub fn new() -> Self {
        let binary = std::env::var(FFPROBE_ENV)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "ffprobe".to_string());
        Self {
            binary: PathBuf::from(binary),
        }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeDurationProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationProbe for FfprobeDurationProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64, AudioError> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| AudioError::ProbeSpawn(format!("{}: {e}", self.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudioError::ProbeFailed(format!(
                "ffprobe exit={}: {}",
                output.status,
                stderr.trim(),
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        text.parse::<f64>()
            .map_err(|_| AudioError::ProbeParse(text.to_string()))
    }
}

/// Header-derived duration for WAV files; no external binary needed.
pub struct WavDurationProbe;

impl DurationProbe for WavDurationProbe {
    fn duration_seconds(&self, path: &Path) -> Result<f64, AudioError> {
        let reader = hound::WavReader::open(path).map_err(|e| AudioError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let spec = reader.spec();
        let frames = reader.duration();
        Ok(frames as f64 / spec.sample_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, seconds: f64) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let n = (sample_rate as f64 * seconds) as usize;
        for i in 0..n {
            writer.write_sample((i % 100) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_wav_probe_reports_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two_seconds.wav");
        write_wav(&path, 16_000, 2.0);

        let seconds = WavDurationProbe.duration_seconds(&path).unwrap();
        assert!((seconds - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_wav_probe_missing_file_fails() {
        let result = WavDurationProbe.duration_seconds(Path::new("/nonexistent/a.wav"));
        assert!(matches!(result, Err(AudioError::OpenFailed { .. })));
    }

    #[test]
    fn test_ffprobe_missing_binary_fails_to_spawn() {
        let probe = FfprobeDurationProbe::with_binary("/nonexistent/ffprobe-bin");
        let result = probe.duration_seconds(Path::new("whatever.wav"));
        assert!(matches!(result, Err(AudioError::ProbeSpawn(_))));
    }
}
