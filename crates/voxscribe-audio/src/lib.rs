pub mod chunker;
pub mod probe;

pub use chunker::{AudioChunker, WavChunker};
pub use probe::{DurationProbe, FfprobeDurationProbe, WavDurationProbe, FFPROBE_ENV};
