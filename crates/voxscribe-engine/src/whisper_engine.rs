use std::path::{Path, PathBuf};

use async_trait::async_trait;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use voxscribe_core::{AudioInput, EngineError};

use crate::engine_trait::{AsrEngine, EngineOptions};

/// ggml models decode 16 kHz mono audio; other rates are rejected rather
/// than silently resampled.
const EXPECTED_SAMPLE_RATE: u32 = 16_000;

pub struct WhisperEngine {
    ctx: Option<WhisperContext>,
    language: Option<String>,
    n_threads: i32,
}

impl WhisperEngine {
    pub fn new() -> Self {
        let n_threads = std::thread::available_parallelism()
            .map(|v| v.get())
            .unwrap_or(2)
            .clamp(1, 8) as i32;
        Self {
            ctx: None,
            language: None,
            n_threads,
        }
    }

    fn model_file(model_id: &str) -> PathBuf {
        let path = Path::new(model_id);
        // Downloaded models live in a directory next to their revision
        // marker; a bare file path is used as-is.
        if path.is_dir() {
            path.join("model.bin")
        } else {
            path.to_path_buf()
        }
    }

    fn decode_file(path: &Path) -> Result<Vec<f32>, EngineError> {
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| EngineError::InferenceFailed(format!("open {path:?}: {e}")))?;
        let spec = reader.spec();
        if spec.sample_rate != EXPECTED_SAMPLE_RATE {
            return Err(EngineError::InferenceFailed(format!(
                "audio must be {EXPECTED_SAMPLE_RATE} Hz, got {} Hz ({path:?})",
                spec.sample_rate,
            )));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| EngineError::InferenceFailed(format!("decode {path:?}: {e}")))?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| EngineError::InferenceFailed(format!("decode {path:?}: {e}")))?
            }
        };

        let channels = spec.channels.max(1) as usize;
        if channels == 1 {
            Ok(interleaved)
        } else {
            Ok(interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect())
        }
    }

    fn decode_one(&self, samples: &[f32], language: Option<&str>) -> Result<String, EngineError> {
        let ctx = self
            .ctx
            .as_ref()
            .ok_or_else(|| EngineError::InferenceFailed("model not loaded".to_string()))?;

        let lang = language.map(language_code);
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(lang.as_deref());
        params.set_translate(false);
        params.set_no_context(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(self.n_threads);

        let mut state = ctx
            .create_state()
            .map_err(|e| EngineError::InferenceFailed(format!("state init: {e}")))?;
        state
            .full(params, samples)
            .map_err(|e| EngineError::InferenceFailed(format!("decode: {e}")))?;

        let count = state
            .full_n_segments()
            .map_err(|e| EngineError::InferenceFailed(format!("segment count: {e}")))?;
        let mut text = String::new();
        for i in 0..count {
            let piece = state
                .full_get_segment_text(i)
                .map_err(|e| EngineError::InferenceFailed(format!("segment {i}: {e}")))?;
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(trimmed);
        }
        Ok(text)
    }
}

impl Default for WhisperEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsrEngine for WhisperEngine {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn load(&mut self, opts: &EngineOptions) -> Result<(), EngineError> {
        if !opts.device.starts_with("cuda") {
            return Err(EngineError::DeviceNotAllowed {
                required: "cuda".to_string(),
                requested: opts.device.clone(),
            });
        }

        // "cuda" and "cuda:N" are both accepted; the runtime picks the
        // default GPU either way.
        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(true);

        let model_file = Self::model_file(&opts.model_id);
        let model_str = model_file.to_string_lossy();
        let ctx = WhisperContext::new_with_params(&model_str, ctx_params)
            .map_err(|e| EngineError::LoadFailed(format!("{model_str}: {e}")))?;

        // ggml weights carry their own quantization; the precision hint only
        // selects between the two sanctioned modes and is logged for parity.
        tracing::info!(
            model = %model_str,
            device = %opts.device,
            precision = %opts.precision,
            max_batch_size = opts.max_batch_size,
            n_threads = self.n_threads,
            "whisper model loaded"
        );
        self.ctx = Some(ctx);
        Ok(())
    }

    async fn transcribe_batch(
        &self,
        inputs: Vec<AudioInput>,
        language: Option<&str>,
    ) -> Result<Vec<String>, EngineError> {
        let mut texts = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let text = match input {
                AudioInput::File(path) => {
                    let samples = Self::decode_file(path)?;
                    self.decode_one(&samples, language)?
                }
                AudioInput::Samples {
                    samples,
                    sample_rate,
                } => {
                    if *sample_rate != EXPECTED_SAMPLE_RATE {
                        return Err(EngineError::InferenceFailed(format!(
                            "audio must be {EXPECTED_SAMPLE_RATE} Hz, got {sample_rate} Hz",
                        )));
                    }
                    self.decode_one(samples, language)?
                }
            };
            texts.push(text);
        }
        Ok(texts)
    }
}

/// Map the protocol's language names onto whisper's ISO codes. Unknown
/// values pass through unchanged.
fn language_code(language: &str) -> String {
    match language.to_ascii_lowercase().as_str() {
        "chinese" => "zh".to_string(),
        "english" => "en".to_string(),
        "japanese" => "ja".to_string(),
        "korean" => "ko".to_string(),
        other => other.to_string(),
    }
}
