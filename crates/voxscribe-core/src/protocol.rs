use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Duration floor used when computing the real-time factor, so a zero-length
/// recording never divides by zero.
pub const MIN_AUDIO_SECONDS: f64 = 1e-6;

/// Type tag carried by the ready announcement line.
pub const READY_TYPE_TAG: &str = "asr_ready";

fn default_language() -> String {
    "Chinese".to_string()
}

fn default_device() -> String {
    "cuda".to_string()
}

/// One request, decoded from one line of stdin.
///
/// `audio_path` is optional at the serde layer so that a missing field is a
/// validation error with a stable message rather than a parser error.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeRequest {
    #[serde(default)]
    pub audio_path: Option<String>,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_device")]
    pub device: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "E_BAD_REQUEST")]
    BadRequest,
    #[serde(rename = "E_DEVICE_NOT_ALLOWED")]
    DeviceNotAllowed,
    #[serde(rename = "E_AUDIO_NOT_FOUND")]
    AudioNotFound,
    #[serde(rename = "E_TRANSCRIBE_FAILED")]
    TranscribeFailed,
    #[serde(rename = "E_MODEL_LOAD_FAILED")]
    ModelLoadFailed,
    #[serde(rename = "E_PROTOCOL_ONLY")]
    ProtocolOnly,
    #[serde(rename = "E_INTERNAL")]
    Internal,
    /// Synthesized by callers when the worker's stdout closes before a
    /// response line arrives. The worker itself never emits this code.
    #[serde(rename = "E_ASR_RUNNER_EOF")]
    RunnerEof,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "E_BAD_REQUEST",
            ErrorCode::DeviceNotAllowed => "E_DEVICE_NOT_ALLOWED",
            ErrorCode::AudioNotFound => "E_AUDIO_NOT_FOUND",
            ErrorCode::TranscribeFailed => "E_TRANSCRIBE_FAILED",
            ErrorCode::ModelLoadFailed => "E_MODEL_LOAD_FAILED",
            ErrorCode::ProtocolOnly => "E_PROTOCOL_ONLY",
            ErrorCode::Internal => "E_INTERNAL",
            ErrorCode::RunnerEof => "E_ASR_RUNNER_EOF",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeMetrics {
    pub audio_seconds: f64,
    pub elapsed_ms: i64,
    pub rtf: f64,
    pub device_used: String,
    pub model_id: String,
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub index: u32,
    pub start_sec: f64,
    pub end_sec: f64,
    pub duration_sec: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingInfo {
    pub enabled: bool,
    pub chunk_sec: f64,
    pub num_segments: usize,
}

/// One response, encoded onto one line of stdout. Every field is serialized
/// even when absent (`null`), matching the established wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub ok: bool,
    pub text: Option<String>,
    pub metrics: Option<TranscribeMetrics>,
    pub error: Option<WireError>,
    pub segments: Option<Vec<TranscriptSegment>>,
    pub chunking: Option<ChunkingInfo>,
}

impl TranscribeResponse {
    pub fn success(
        text: String,
        metrics: TranscribeMetrics,
        segments: Vec<TranscriptSegment>,
        chunking: ChunkingInfo,
    ) -> Self {
        Self {
            ok: true,
            text: Some(text),
            metrics: Some(metrics),
            error: None,
            segments: Some(segments),
            chunking: Some(chunking),
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::failure_with_details(code, message, None)
    }

    pub fn failure_with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            ok: false,
            text: None,
            metrics: None,
            error: Some(WireError {
                code,
                message: message.into(),
                details,
            }),
            segments: None,
            chunking: None,
        }
    }
}

/// Out-of-band line written once after a successful model load, so a
/// supervisor can tell "still loading" apart from "ready for work".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyAnnouncement {
    #[serde(rename = "type")]
    pub kind: String,
    pub ok: bool,
    pub model_id: String,
    pub model_version: Option<String>,
    pub device_used: String,
    pub warmup_ms: i64,
}

impl ReadyAnnouncement {
    pub fn new(
        model_id: String,
        model_version: Option<String>,
        device_used: String,
        warmup_ms: i64,
    ) -> Self {
        Self {
            kind: READY_TYPE_TAG.to_string(),
            ok: true,
            model_id,
            model_version,
            device_used,
            warmup_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_applied() {
        let req: TranscribeRequest =
            serde_json::from_str(r#"{"audio_path": "a.wav"}"#).unwrap();
        assert_eq!(req.audio_path.as_deref(), Some("a.wav"));
        assert_eq!(req.language, "Chinese");
        assert_eq!(req.device, "cuda");
    }

    #[test]
    fn test_request_missing_audio_path_still_parses() {
        let req: TranscribeRequest = serde_json::from_str(r#"{"device": "cpu"}"#).unwrap();
        assert!(req.audio_path.is_none());
        assert_eq!(req.device, "cpu");
    }

    #[test]
    fn test_request_unknown_fields_ignored() {
        let req: TranscribeRequest =
            serde_json::from_str(r#"{"audio_path": "a.wav", "extra": 1}"#).unwrap();
        assert_eq!(req.audio_path.as_deref(), Some("a.wav"));
    }

    #[test]
    fn test_error_code_wire_names() {
        let json = serde_json::to_string(&ErrorCode::DeviceNotAllowed).unwrap();
        assert_eq!(json, "\"E_DEVICE_NOT_ALLOWED\"");
        let code: ErrorCode = serde_json::from_str("\"E_AUDIO_NOT_FOUND\"").unwrap();
        assert_eq!(code, ErrorCode::AudioNotFound);
        assert_eq!(ErrorCode::ProtocolOnly.as_str(), "E_PROTOCOL_ONLY");
    }

    #[test]
    fn test_failure_response_shape() {
        let resp = TranscribeResponse::failure(ErrorCode::BadRequest, "audio_path is required.");
        assert!(!resp.ok);
        assert!(resp.text.is_none());
        assert!(resp.metrics.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.message, "audio_path is required.");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_failure_serializes_absent_fields_as_null() {
        let resp = TranscribeResponse::failure(ErrorCode::Internal, "boom");
        let v: Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["ok"], Value::Bool(false));
        assert!(v["text"].is_null());
        assert!(v["metrics"].is_null());
        assert!(v["segments"].is_null());
        assert!(v["chunking"].is_null());
        assert_eq!(v["error"]["code"], "E_INTERNAL");
    }

    #[test]
    fn test_success_response_shape() {
        let metrics = TranscribeMetrics {
            audio_seconds: 10.0,
            elapsed_ms: 500,
            rtf: 0.05,
            device_used: "cuda".to_string(),
            model_id: "m".to_string(),
            model_version: None,
        };
        let segment = TranscriptSegment {
            index: 0,
            start_sec: 0.0,
            end_sec: 10.0,
            duration_sec: 10.0,
            text: "hello".to_string(),
        };
        let chunking = ChunkingInfo {
            enabled: false,
            chunk_sec: 60.0,
            num_segments: 1,
        };
        let resp =
            TranscribeResponse::success("hello".to_string(), metrics, vec![segment], chunking);
        assert!(resp.ok);
        assert_eq!(resp.text.as_deref(), Some("hello"));
        assert!(resp.error.is_none());
        assert_eq!(resp.segments.unwrap().len(), 1);
        assert!(!resp.chunking.unwrap().enabled);
    }

    #[test]
    fn test_ready_announcement_type_tag() {
        let ready = ReadyAnnouncement::new("m".to_string(), None, "cuda".to_string(), 1234);
        let v: Value = serde_json::to_value(&ready).unwrap();
        assert_eq!(v["type"], "asr_ready");
        assert_eq!(v["ok"], Value::Bool(true));
        assert_eq!(v["warmup_ms"], 1234);
        assert!(v["model_version"].is_null());
    }
}
