use std::path::PathBuf;

/// One audio input handed to the inference backend: either a whole file on
/// disk, or an already-decoded mono sample buffer.
#[derive(Debug, Clone)]
pub enum AudioInput {
    File(PathBuf),
    Samples { samples: Vec<f32>, sample_rate: u32 },
}

/// A bounded-length contiguous slice of a recording, as produced by an
/// `AudioChunker`. Parts cover the recording in order, without gaps.
#[derive(Debug, Clone)]
pub struct AudioPart {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub offset_sec: f64,
}

impl AudioPart {
    /// Segment duration is derived from the sample count, not from the
    /// distance to the next part's offset.
    pub fn duration_sec(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn into_input(self) -> AudioInput {
        AudioInput::Samples {
            samples: self.samples,
            sample_rate: self.sample_rate,
        }
    }
}
