pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

pub use config::{Precision, WorkerConfig};
pub use error::{AudioError, ConfigError, EngineError, RequestError};
pub use protocol::{
    ChunkingInfo, ErrorCode, ReadyAnnouncement, TranscribeMetrics, TranscribeRequest,
    TranscribeResponse, TranscriptSegment, WireError, MIN_AUDIO_SECONDS, READY_TYPE_TAG,
};
pub use types::{AudioInput, AudioPart};
