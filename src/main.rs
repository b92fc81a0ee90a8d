use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use voxscribe_audio::{FfprobeDurationProbe, WavChunker};
use voxscribe_core::{ErrorCode, Precision, TranscribeResponse, WorkerConfig};
use voxscribe_engine::EngineRegistry;
use voxscribe_worker::{SessionOutcome, WorkerSession};

/// Distinct exit code for "backend failed to load", so a supervisor can tell
/// it apart from ordinary failures.
const EXIT_MODEL_LOAD_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "voxscribe", about = "Speech-to-text worker speaking JSONL over stdio")]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model path or repo-style identifier
    #[arg(long)]
    model: Option<String>,

    /// Numeric precision: float16 or bfloat16
    #[arg(long)]
    precision: Option<Precision>,

    /// Required accelerated-device identifier
    #[arg(long)]
    device: Option<String>,

    /// Backend-internal batch size cap
    #[arg(long)]
    max_batch_size: Option<usize>,

    /// Split audio longer than this many seconds into chunks (seconds)
    #[arg(long)]
    chunk_sec: Option<f64>,

    /// Inference backend to load
    #[arg(long)]
    engine: Option<String>,

    /// Log filter directive (stderr only; stdout carries the protocol)
    #[arg(long)]
    log_level: Option<String>,

    /// Do not load a model; only validate the request/response protocol
    #[arg(long)]
    protocol_only: bool,

    /// Emit one asr_ready line after the model loads
    #[arg(long)]
    announce_ready: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut WorkerConfig) {
        if let Some(model) = &self.model {
            config.model_id = model.clone();
        }
        if let Some(precision) = self.precision {
            config.precision = precision;
        }
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(max_batch_size) = self.max_batch_size {
            config.max_batch_size = max_batch_size;
        }
        if let Some(chunk_sec) = self.chunk_sec {
            config.chunk_sec = chunk_sec;
        }
        if let Some(engine) = &self.engine {
            config.engine = engine.clone();
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }
        if self.protocol_only {
            config.protocol_only = true;
        }
        if self.announce_ready {
            config.announce_ready = true;
        }
    }
}

fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut term = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGTERM handler");
                    return;
                }
            };
            let mut int = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGINT handler");
                    return;
                }
            };
            tokio::select! {
                _ = term.recv() => tracing::info!("SIGTERM received"),
                _ = int.recv() => tracing::info!("SIGINT received"),
            }
        }
        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to wait for ctrl-c");
                return;
            }
            tracing::info!("ctrl-c received");
        }
        shutdown.cancel();
    });
}

/// Report a startup failure on the wire, then exit with the load-failure
/// code.
fn exit_load_failed(message: String) -> ! {
    let resp = TranscribeResponse::failure(ErrorCode::ModelLoadFailed, message);
    if let Ok(line) = serde_json::to_string(&resp) {
        println!("{line}");
    }
    std::process::exit(EXIT_MODEL_LOAD_FAILED);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => WorkerConfig::load_from_file(path)
            .with_context(|| format!("failed to load config from {path:?}"))?,
        None => WorkerConfig::default(),
    };
    cli.apply_to(&mut config);

    let env_filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false),
    );
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!(
        model_id = %config.model_id,
        device = %config.device,
        chunk_sec = config.chunk_sec,
        protocol_only = config.protocol_only,
        "voxscribe starting"
    );

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let engine = if config.protocol_only {
        None
    } else {
        let registry = EngineRegistry::new();
        match registry.create(&config.engine) {
            Ok(engine) => Some(engine),
            Err(e) => {
                tracing::error!(engine = %config.engine, error = %e, "no such engine");
                exit_load_failed(e.to_string());
            }
        }
    };

    let mut session = WorkerSession::new(
        config,
        engine,
        Box::new(FfprobeDurationProbe::new()),
        Box::new(WavChunker),
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let outcome = session
        .run(stdin, stdout, shutdown)
        .await
        .context("protocol channel error")?;

    if outcome == SessionOutcome::LoadFailed {
        std::process::exit(EXIT_MODEL_LOAD_FAILED);
    }
    tracing::info!(?outcome, "voxscribe stopped");
    Ok(())
}
