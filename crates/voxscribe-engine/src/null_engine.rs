use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use voxscribe_core::{AudioInput, EngineError};

use crate::engine_trait::{AsrEngine, EngineOptions};

/// Deterministic diagnostic backend. Echoes a description of each input
/// instead of real text, so the protocol and pipeline can be exercised
/// without model weights or GPU hardware.
pub struct NullEngine {
    batch_count: AtomicUsize,
}

impl NullEngine {
    pub fn new() -> Self {
        Self {
            batch_count: AtomicUsize::new(0),
        }
    }

    pub fn batch_count(&self) -> usize {
        self.batch_count.load(Ordering::Relaxed)
    }
}

impl Default for NullEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsrEngine for NullEngine {
    fn name(&self) -> &str {
        "null"
    }

    async fn load(&mut self, opts: &EngineOptions) -> Result<(), EngineError> {
        tracing::debug!(model_id = %opts.model_id, "NullEngine loaded (no-op)");
        Ok(())
    }

    async fn transcribe_batch(
        &self,
        inputs: Vec<AudioInput>,
        _language: Option<&str>,
    ) -> Result<Vec<String>, EngineError> {
        let count = self.batch_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!("NullEngine batch #{count}, {} input(s)", inputs.len());
        Ok(inputs
            .iter()
            .map(|input| match input {
                AudioInput::File(path) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    format!("[null] {name}")
                }
                AudioInput::Samples { samples, .. } => {
                    format!("[null] {} samples", samples.len())
                }
            })
            .collect())
    }
}
