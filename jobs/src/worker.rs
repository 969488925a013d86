use crate::queue::Job;
use ingestion::processor::{EventPipeline, LineOutcome, Mode, PipelineError, RunReport};
use spendgraph_core::error::SpendgraphError;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Single consumer that owns the pipeline. Every graph mutation and purchase
/// evaluation happens here, one job at a time, in channel order.
pub struct Worker {
    receiver: mpsc::Receiver<Job>,
    pipeline: EventPipeline,
    mode: Mode,
}

impl Worker {
    pub fn new(receiver: mpsc::Receiver<Job>, pipeline: EventPipeline) -> Self {
        Self {
            receiver,
            pipeline,
            mode: Mode::Detect,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Drain the queue until every sender is dropped, then hand the pipeline back.
    pub async fn run(mut self) -> Result<(EventPipeline, RunReport), PipelineError> {
        info!("Worker started");
        let mut report = RunReport::default();
        while let Some(job) = self.receiver.recv().await {
            let outcome = match job {
                Job::Apply(event) => self
                    .pipeline
                    .apply(&event, self.mode)
                    .map(LineOutcome::Applied),
                Job::Line { number, line } => self.pipeline.apply_line(number, &line, self.mode),
                Job::Bytes { number, bytes } => self.pipeline.apply_bytes(number, &bytes, self.mode),
            };
            match outcome {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    error!(code = %e.error_code(), "Worker stopped on fatal error: {}", e);
                    return Err(e);
                }
            }
        }
        info!(
            events = report.events,
            skipped = report.skipped,
            flagged = report.flagged,
            "Worker stopped"
        );
        Ok((self.pipeline, report))
    }
}
