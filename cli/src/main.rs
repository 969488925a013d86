use anyhow::Context;
use clap::Parser;
use ingestion::processor::{EventPipeline, PipelineError};
use jobs::{ChannelEventQueue, EventQueue, Job, Worker};
use spendgraph_core::config::{AppConfig, ConfigOverrides};
use spendgraph_core::error::{ErrorCode, SpendgraphError};
use spendgraph_core::sink::{FlagSink, InMemoryFlagSink, JsonlFlagSink, SinkError};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Flag purchases that are anomalous for the buyer's social network.
#[derive(Parser, Debug)]
#[command(name = "spendgraph", version)]
struct Cli {
    /// Configuration file; replaces config/default and config/$RUN_MODE.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Batch log: parameter header followed by historical events.
    batch_log: Option<String>,

    /// Stream log: events to evaluate.
    stream_log: Option<String>,

    /// Output file for flagged purchases (JSON Lines).
    flagged_purchases: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            batch_log: self.batch_log.clone(),
            stream_log: self.stream_log.clone(),
            flagged_purchases: self.flagged_purchases.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    spendgraph_core::init_tracing();

    let cli = Cli::parse();
    let config = match AppConfig::load_with(&cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            let err = anyhow::Error::new(e).context("failed to load configuration");
            return Err(fatal(ErrorCode::InvalidConfig, err));
        }
    };
    run(config).await.map_err(|e| fatal(error_code(&e), e))
}

/// Log a fatal error with its stable code and tag the exit message with it.
fn fatal(code: ErrorCode, err: anyhow::Error) -> anyhow::Error {
    error!(code = %code, "{:#}", err);
    err.context(format!("fatal error {}", code))
}

fn error_code(err: &anyhow::Error) -> ErrorCode {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<PipelineError>() {
            return e.error_code();
        }
        if let Some(e) = cause.downcast_ref::<SinkError>() {
            return e.error_code();
        }
        if cause.is::<std::io::Error>() {
            return ErrorCode::Io;
        }
    }
    ErrorCode::Internal
}

async fn run(config: AppConfig) -> anyhow::Result<()> {
    // Batch purchases are never flagged, so the output is only opened once the
    // batch log has been accepted.
    let mut pipeline =
        EventPipeline::from_batch_file(&config.input.batch_log, Arc::new(InMemoryFlagSink::default()))
            .with_context(|| format!("cannot replay {}", config.input.batch_log.display()))?;

    let sink = Arc::new(
        JsonlFlagSink::create(&config.output.flagged_purchases).with_context(|| {
            format!(
                "cannot create output {}",
                config.output.flagged_purchases.display()
            )
        })?,
    );
    pipeline.set_sink(sink.clone());

    let (queue, receiver) = ChannelEventQueue::bounded(config.queue.capacity);
    let worker = tokio::spawn(Worker::new(receiver, pipeline).run());

    let stream = tokio::fs::File::open(&config.input.stream_log)
        .await
        .with_context(|| format!("cannot open {}", config.input.stream_log.display()))?;
    let mut reader = BufReader::new(stream);
    let mut number = 0u64;
    loop {
        let mut bytes = Vec::new();
        if reader.read_until(b'\n', &mut bytes).await? == 0 {
            break;
        }
        number += 1;
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }
        if let Err(e) = queue.enqueue(Job::Bytes { number, bytes }).await {
            // The worker only hangs up on a fatal error, reported below.
            warn!("Stopped feeding stream log: {}", e);
            break;
        }
    }
    drop(queue);

    let (pipeline, report) = worker.await.context("worker task failed")??;
    info!(
        events = report.events,
        skipped = report.skipped,
        flagged = sink.emitted(),
        metrics = ?pipeline.metrics().snapshot(),
        output = %config.output.flagged_purchases.display(),
        "Run complete"
    );
    Ok(())
}
