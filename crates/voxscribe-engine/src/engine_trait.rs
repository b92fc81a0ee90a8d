use async_trait::async_trait;
use voxscribe_core::{AudioInput, EngineError, Precision, WorkerConfig};

/// Everything a backend needs to load its model once at startup.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub model_id: String,
    pub precision: Precision,
    pub device: String,
    pub max_batch_size: usize,
}

impl EngineOptions {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            model_id: config.model_id.clone(),
            precision: config.precision,
            device: config.device.clone(),
            max_batch_size: config.max_batch_size,
        }
    }
}

/// Inference backend capability. One production implementation, one
/// deterministic diagnostic implementation; the session is constructed with
/// whichever fits.
#[async_trait]
pub trait AsrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Load the model. Called exactly once per process, before any request.
    /// Loading on a non-accelerated device must fail rather than fall back.
    async fn load(&mut self, opts: &EngineOptions) -> Result<(), EngineError>;

    /// Transcribe a batch of inputs in one call, returning one text per
    /// input in input order.
    async fn transcribe_batch(
        &self,
        inputs: Vec<AudioInput>,
        language: Option<&str>,
    ) -> Result<Vec<String>, EngineError>;
}
