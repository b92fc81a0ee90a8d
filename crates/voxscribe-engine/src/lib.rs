pub mod engine_trait;
pub mod null_engine;
pub mod registry;
#[cfg(feature = "whisper")]
pub mod whisper_engine;

pub use engine_trait::{AsrEngine, EngineOptions};
pub use null_engine::NullEngine;
pub use registry::EngineRegistry;
#[cfg(feature = "whisper")]
pub use whisper_engine::WhisperEngine;
