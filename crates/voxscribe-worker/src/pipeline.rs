use std::time::Instant;

use voxscribe_audio::{AudioChunker, DurationProbe};
use voxscribe_core::{
    AudioInput, ChunkingInfo, RequestError, TranscribeMetrics, TranscribeResponse,
    TranscriptSegment, WorkerConfig, MIN_AUDIO_SECONDS,
};
use voxscribe_engine::AsrEngine;

use crate::model_version::resolve_model_version;
use crate::validate::ValidatedRequest;

/// Orchestrates probe, optional chunking, the batched backend call, segment
/// stitching and metrics. Every failure in here is recovered at the session
/// loop as one error response; nothing propagates past the protocol
/// boundary.
pub struct TranscriptionPipeline<'a> {
    engine: &'a dyn AsrEngine,
    probe: &'a dyn DurationProbe,
    chunker: &'a dyn AudioChunker,
    config: &'a WorkerConfig,
}

impl<'a> TranscriptionPipeline<'a> {
    pub fn new(
        engine: &'a dyn AsrEngine,
        probe: &'a dyn DurationProbe,
        chunker: &'a dyn AudioChunker,
        config: &'a WorkerConfig,
    ) -> Self {
        Self {
            engine,
            probe,
            chunker,
            config,
        }
    }

    pub async fn transcribe(
        &self,
        req: &ValidatedRequest,
    ) -> Result<TranscribeResponse, RequestError> {
        let audio_seconds = self.probe.duration_seconds(&req.audio_path)?;
        let started = Instant::now();

        let chunk_sec = self.config.chunk_sec;
        let (text, segments) = if audio_seconds > chunk_sec {
            self.transcribe_chunked(req).await?
        } else {
            self.transcribe_single(req, audio_seconds).await?
        };

        let elapsed_ms = started.elapsed().as_millis() as i64;
        let rtf = (elapsed_ms as f64 / 1000.0) / audio_seconds.max(MIN_AUDIO_SECONDS);

        tracing::debug!(
            audio_seconds,
            elapsed_ms,
            rtf,
            num_segments = segments.len(),
            "transcription finished"
        );

        let chunking = ChunkingInfo {
            enabled: audio_seconds > chunk_sec,
            chunk_sec,
            num_segments: segments.len(),
        };
        let metrics = TranscribeMetrics {
            audio_seconds,
            elapsed_ms,
            rtf,
            device_used: self.config.device.clone(),
            model_id: self.config.model_id.clone(),
            model_version: resolve_model_version(&self.config.model_id),
        };
        Ok(TranscribeResponse::success(text, metrics, segments, chunking))
    }

    /// Whole-file transcription: one backend call, one segment spanning the
    /// full recording.
    async fn transcribe_single(
        &self,
        req: &ValidatedRequest,
        audio_seconds: f64,
    ) -> Result<(String, Vec<TranscriptSegment>), RequestError> {
        let inputs = vec![AudioInput::File(req.audio_path.clone())];
        let results = self
            .engine
            .transcribe_batch(inputs, Some(&req.language))
            .await?;

        let text = results.into_iter().next().unwrap_or_default();
        if text.trim().is_empty() {
            return Err(RequestError::TranscribeFailed(
                "empty transcription text".to_string(),
            ));
        }

        let segments = vec![TranscriptSegment {
            index: 0,
            start_sec: 0.0,
            end_sec: audio_seconds,
            duration_sec: audio_seconds,
            text: text.clone(),
        }];
        Ok((text, segments))
    }

    /// Long-recording path: split into bounded parts, transcribe all parts
    /// in one batched call, and stitch texts back together in order.
    /// Segment timing is derived from each part's sample count; a result
    /// list shorter than the part list yields empty text for the tail
    /// segments rather than failing the request.
    async fn transcribe_chunked(
        &self,
        req: &ValidatedRequest,
    ) -> Result<(String, Vec<TranscriptSegment>), RequestError> {
        let parts = self.chunker.split(&req.audio_path, self.config.chunk_sec)?;
        if parts.is_empty() {
            return Err(RequestError::TranscribeFailed(
                "audio chunker produced no parts".to_string(),
            ));
        }

        let timing: Vec<(f64, f64)> = parts
            .iter()
            .map(|p| (p.offset_sec, p.duration_sec()))
            .collect();
        let inputs: Vec<AudioInput> = parts.into_iter().map(|p| p.into_input()).collect();
        let results = self
            .engine
            .transcribe_batch(inputs, Some(&req.language))
            .await?;

        let mut text = String::new();
        let mut segments = Vec::with_capacity(timing.len());
        for (i, (offset_sec, duration_sec)) in timing.iter().enumerate() {
            let segment_text = results.get(i).cloned().unwrap_or_default();
            text.push_str(&segment_text);
            segments.push(TranscriptSegment {
                index: i as u32,
                start_sec: *offset_sec,
                end_sec: offset_sec + duration_sec,
                duration_sec: *duration_sec,
                text: segment_text,
            });
        }

        if text.trim().is_empty() {
            return Err(RequestError::TranscribeFailed(
                "empty transcription text (chunked)".to_string(),
            ));
        }
        Ok((text, segments))
    }
}
