use std::io;
use std::time::Instant;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use voxscribe_audio::{AudioChunker, DurationProbe};
use voxscribe_core::{
    ErrorCode, ReadyAnnouncement, RequestError, TranscribeRequest, TranscribeResponse,
    WorkerConfig,
};
use voxscribe_engine::{AsrEngine, EngineOptions};

use crate::model_version::resolve_model_version;
use crate::pipeline::TranscriptionPipeline;
use crate::validate::validate;

/// How a session ended. `LoadFailed` maps to the distinct non-zero process
/// exit code; the other two are normal termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The request channel reached end-of-input.
    InputExhausted,
    /// A termination signal was observed before starting the next request.
    Cancelled,
    /// The backend failed to load; no request was ever processed.
    LoadFailed,
}

/// Owns the loaded backend and drives the line protocol: one request line
/// in, exactly one response line out, in order, flushed per response.
pub struct WorkerSession {
    config: WorkerConfig,
    engine: Option<Box<dyn AsrEngine>>,
    probe: Box<dyn DurationProbe>,
    chunker: Box<dyn AudioChunker>,
}

impl WorkerSession {
    /// `engine` is `None` in protocol-only mode; the backend is then never
    /// constructed, let alone loaded.
    pub fn new(
        config: WorkerConfig,
        engine: Option<Box<dyn AsrEngine>>,
        probe: Box<dyn DurationProbe>,
        chunker: Box<dyn AudioChunker>,
    ) -> Self {
        Self {
            config,
            engine,
            probe,
            chunker,
        }
    }

    pub async fn run<R, W>(
        &mut self,
        reader: R,
        mut writer: W,
        shutdown: CancellationToken,
    ) -> io::Result<SessionOutcome>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if let Some(engine) = self.engine.as_mut() {
            let opts = EngineOptions::from_config(&self.config);
            let started = Instant::now();
            if let Err(e) = engine.load(&opts).await {
                tracing::error!(error = %e, "backend failed to load");
                let resp =
                    TranscribeResponse::failure(ErrorCode::ModelLoadFailed, e.to_string());
                write_json_line(&mut writer, &resp).await?;
                return Ok(SessionOutcome::LoadFailed);
            }
            let warmup_ms = started.elapsed().as_millis() as i64;
            tracing::info!(
                model_id = %self.config.model_id,
                device = %self.config.device,
                warmup_ms,
                "backend loaded"
            );

            if self.config.announce_ready {
                let ready = ReadyAnnouncement::new(
                    self.config.model_id.clone(),
                    resolve_model_version(&self.config.model_id),
                    self.config.device.clone(),
                    warmup_ms,
                );
                write_json_line(&mut writer, &ready).await?;
            }
        } else {
            tracing::info!("protocol-only mode; backend not loaded");
        }

        let mut lines = reader.lines();
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("termination requested; stopping before next request");
                    return Ok(SessionOutcome::Cancelled);
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = next else {
                tracing::info!("input exhausted; shutting down");
                return Ok(SessionOutcome::InputExhausted);
            };

            // A signal may have landed while the line was being read; stop
            // before starting work on it.
            if shutdown.is_cancelled() {
                tracing::info!("termination requested; dropping pending request");
                return Ok(SessionOutcome::Cancelled);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = self.handle_line(trimmed).await;
            write_json_line(&mut writer, &response).await?;
        }
    }

    /// One line in, one response out. Nothing in here is allowed to take
    /// the session down.
    async fn handle_line(&self, line: &str) -> TranscribeResponse {
        let req = match serde_json::from_str::<TranscribeRequest>(line) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting unparseable request line");
                return TranscribeResponse::failure(
                    ErrorCode::BadRequest,
                    format!("invalid JSON: {e}"),
                );
            }
        };

        match self.handle_request(&req).await {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(code = err.code().as_str(), error = %err, "request failed");
                err.into_response()
            }
        }
    }

    async fn handle_request(
        &self,
        req: &TranscribeRequest,
    ) -> Result<TranscribeResponse, RequestError> {
        let validated = validate(req, &self.config.device)?;

        if self.config.protocol_only {
            return Err(RequestError::ProtocolOnly);
        }
        let Some(engine) = self.engine.as_deref() else {
            return Err(RequestError::ProtocolOnly);
        };

        let pipeline = TranscriptionPipeline::new(
            engine,
            self.probe.as_ref(),
            self.chunker.as_ref(),
            &self.config,
        );
        pipeline.transcribe(&validated).await
    }
}

/// Serialize one value onto one line and flush it. Encoding failure cannot
/// cross the protocol boundary unstructured: it degrades to a constant
/// `E_INTERNAL` line.
async fn write_json_line<W, T>(writer: &mut W, value: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = match serde_json::to_string(value) {
        Ok(line) => line,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response");
            concat!(
                r#"{"ok":false,"text":null,"metrics":null,"#,
                r#""error":{"code":"E_INTERNAL","message":"failed to encode response","details":null},"#,
                r#""segments":null,"chunking":null}"#,
            )
            .to_string()
        }
    };
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}
