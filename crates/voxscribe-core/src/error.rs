use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::protocol::{ErrorCode, TranscribeResponse};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("unsupported precision: {0}")]
    UnsupportedPrecision(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to run duration probe: {0}")]
    ProbeSpawn(String),

    #[error("duration probe failed: {0}")]
    ProbeFailed(String),

    #[error("duration probe returned unparseable output: {0}")]
    ProbeParse(String),

    #[error("failed to open audio file {path:?}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("failed to decode audio file {path:?}: {reason}")]
    DecodeFailed { path: PathBuf, reason: String },

    #[error("audio file {path:?} contains no samples")]
    EmptyAudio { path: PathBuf },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine not found: {0}")]
    EngineNotFound(String),

    #[error("model load failed: {0}")]
    LoadFailed(String),

    #[error("CPU/device fallback is not allowed; device must be {required}, got {requested}")]
    DeviceNotAllowed { required: String, requested: String },

    #[error("inference failed: {0}")]
    InferenceFailed(String),
}

/// Per-request failure, carrying the wire code it maps to. Everything in
/// this enum is recovered at the session loop and turned into exactly one
/// error response line.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("CPU/device fallback is not allowed.")]
    DeviceNotAllowed { requested: String },

    #[error("audio_path is required.")]
    MissingAudioPath,

    #[error("audio_path does not exist.")]
    AudioNotFound { audio_path: String },

    #[error("protocol-only mode")]
    ProtocolOnly,

    #[error("{0}")]
    TranscribeFailed(String),

    #[error("{0}")]
    Internal(String),
}

impl RequestError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RequestError::DeviceNotAllowed { .. } => ErrorCode::DeviceNotAllowed,
            RequestError::MissingAudioPath => ErrorCode::BadRequest,
            RequestError::AudioNotFound { .. } => ErrorCode::AudioNotFound,
            RequestError::ProtocolOnly => ErrorCode::ProtocolOnly,
            RequestError::TranscribeFailed(_) => ErrorCode::TranscribeFailed,
            RequestError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn details(&self) -> Option<Map<String, Value>> {
        match self {
            RequestError::AudioNotFound { audio_path } => {
                let mut details = Map::new();
                details.insert(
                    "audio_path".to_string(),
                    Value::String(audio_path.clone()),
                );
                Some(details)
            }
            _ => None,
        }
    }

    pub fn into_response(self) -> TranscribeResponse {
        let details = self.details();
        TranscribeResponse::failure_with_details(self.code(), self.to_string(), details)
    }
}

impl From<AudioError> for RequestError {
    fn from(err: AudioError) -> Self {
        RequestError::TranscribeFailed(err.to_string())
    }
}

impl From<EngineError> for RequestError {
    fn from(err: EngineError) -> Self {
        RequestError::TranscribeFailed(err.to_string())
    }
}
