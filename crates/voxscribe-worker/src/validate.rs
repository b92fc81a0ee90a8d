use std::path::{Path, PathBuf};

use voxscribe_core::{RequestError, TranscribeRequest};

/// A request that passed policy checks and is safe to hand to the pipeline.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub audio_path: PathBuf,
    pub language: String,
}

/// Policy checks, in order: device, then audio_path presence, then audio_path
/// existence. Read-only; the first failure wins.
pub fn validate(
    req: &TranscribeRequest,
    required_device: &str,
) -> Result<ValidatedRequest, RequestError> {
    if req.device != required_device {
        return Err(RequestError::DeviceNotAllowed {
            requested: req.device.clone(),
        });
    }

    let audio_path = match req.audio_path.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => return Err(RequestError::MissingAudioPath),
    };

    if !Path::new(audio_path).exists() {
        return Err(RequestError::AudioNotFound {
            audio_path: audio_path.to_string(),
        });
    }

    Ok(ValidatedRequest {
        audio_path: PathBuf::from(audio_path),
        language: req.language.clone(),
    })
}
