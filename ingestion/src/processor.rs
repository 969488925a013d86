use crate::parse::{decode_line, parse_event_line, ParseError};
use detection::AnomalyDetector;
use serde::{Deserialize, Serialize};
use spendgraph_core::config::{NetworkParams, ParamsError};
use spendgraph_core::error::{ErrorCode, SpendgraphError};
use spendgraph_core::metrics::PipelineMetrics;
use spendgraph_core::model::{Event, FlaggedPurchase};
use spendgraph_core::sink::{FlagSink, SinkError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use storage::history::PurchaseHistory;
use storage::network::SocialNetwork;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Batch log has no parameter header")]
    MissingHeader,
    #[error("Invalid network parameters: {0}")]
    Params(#[from] ParamsError),
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl SpendgraphError for PipelineError {
    fn error_code(&self) -> ErrorCode {
        match self {
            PipelineError::Io(_) => ErrorCode::Io,
            PipelineError::MissingHeader => ErrorCode::InvalidConfig,
            PipelineError::Params(e) => e.error_code(),
            PipelineError::Sink(e) => e.error_code(),
        }
    }
}

/// How purchases are handled while applying events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Record purchases to build history; nothing is flagged.
    Replay,
    /// Evaluate each purchase before recording it.
    Detect,
}

/// Line counts for one batch or stream run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub events: u64,
    pub skipped: u64,
    pub flagged: u64,
}

impl RunReport {
    pub fn record(&mut self, outcome: &LineOutcome) {
        match outcome {
            LineOutcome::Applied(flagged) => {
                self.events += 1;
                if flagged.is_some() {
                    self.flagged += 1;
                }
            }
            LineOutcome::Blank => {}
            LineOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Applied(Option<FlaggedPurchase>),
    Blank,
    Skipped(ParseError),
}

/// Applies events in arrival order to the social network and sends flagged
/// purchases to the sink.
pub struct EventPipeline {
    network: SocialNetwork,
    detector: AnomalyDetector,
    sink: Arc<dyn FlagSink>,
    metrics: PipelineMetrics,
}

impl EventPipeline {
    /// Per-user history is capped at `T`, which never changes a window of `T`.
    pub fn new(params: NetworkParams, sink: Arc<dyn FlagSink>) -> Self {
        let history = PurchaseHistory::with_retention(params.tracked_purchases);
        Self::with_network(
            SocialNetwork::with_history(history),
            AnomalyDetector::new(params),
            sink,
        )
    }

    pub fn with_network(
        network: SocialNetwork,
        detector: AnomalyDetector,
        sink: Arc<dyn FlagSink>,
    ) -> Self {
        Self {
            network,
            detector,
            sink,
            metrics: PipelineMetrics::default(),
        }
    }

    /// Build a pipeline from a batch log: the first non-blank line holds the
    /// parameters, the remaining events are replayed without flagging.
    pub fn from_batch<R: BufRead>(reader: R, sink: Arc<dyn FlagSink>) -> Result<Self, PipelineError> {
        let mut lines = reader.split(b'\n');
        let params = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    let header = String::from_utf8_lossy(&line);
                    if !header.trim().is_empty() {
                        break NetworkParams::from_header(&header)?;
                    }
                }
                None => return Err(PipelineError::MissingHeader),
            }
        };
        info!(
            degree = params.degree,
            tracked_purchases = params.tracked_purchases,
            "Network parameters loaded"
        );

        let mut pipeline = Self::new(params, sink);
        let report = pipeline.run_lines(lines, Mode::Replay)?;
        info!(
            events = report.events,
            skipped = report.skipped,
            "Batch log replayed"
        );
        Ok(pipeline)
    }

    pub fn from_batch_file(path: impl AsRef<Path>, sink: Arc<dyn FlagSink>) -> Result<Self, PipelineError> {
        let file = File::open(path.as_ref())?;
        Self::from_batch(BufReader::new(file), sink)
    }

    /// Apply every line of a stream log, flagging anomalous purchases.
    pub fn process_stream<R: BufRead>(&mut self, reader: R) -> Result<RunReport, PipelineError> {
        let report = self.run_lines(reader.split(b'\n'), Mode::Detect)?;
        info!(
            events = report.events,
            skipped = report.skipped,
            flagged = report.flagged,
            "Stream log processed"
        );
        Ok(report)
    }

    pub fn process_stream_file(&mut self, path: impl AsRef<Path>) -> Result<RunReport, PipelineError> {
        let file = File::open(path.as_ref())?;
        self.process_stream(BufReader::new(file))
    }

    fn run_lines<I>(&mut self, lines: I, mode: Mode) -> Result<RunReport, PipelineError>
    where
        I: Iterator<Item = std::io::Result<Vec<u8>>>,
    {
        let mut report = RunReport::default();
        for (index, line) in lines.enumerate() {
            let line = line?;
            report.record(&self.apply_bytes(index as u64 + 1, &line, mode)?);
        }
        Ok(report)
    }

    /// Decode and apply one raw log line; bytes that are not UTF-8 are skipped.
    pub fn apply_bytes(&mut self, number: u64, bytes: &[u8], mode: Mode) -> Result<LineOutcome, PipelineError> {
        match decode_line(bytes) {
            Ok(line) => self.apply_line(number, line, mode),
            Err(e) => Ok(self.skip(number, e)),
        }
    }

    /// Parse and apply one log line. Malformed lines are skipped, never fatal.
    pub fn apply_line(&mut self, number: u64, line: &str, mode: Mode) -> Result<LineOutcome, PipelineError> {
        match parse_event_line(line) {
            Ok(event) => Ok(LineOutcome::Applied(self.apply(&event, mode)?)),
            Err(ParseError::Blank) => Ok(LineOutcome::Blank),
            Err(e) => Ok(self.skip(number, e)),
        }
    }

    fn skip(&mut self, number: u64, error: ParseError) -> LineOutcome {
        self.metrics.record_skipped_line();
        warn!(line = number, code = %error.error_code(), error = %error, "Skipping malformed event");
        LineOutcome::Skipped(error)
    }

    /// Apply a parsed event. Returns the flagged record, if any.
    pub fn apply(&mut self, event: &Event, mode: Mode) -> Result<Option<FlaggedPurchase>, PipelineError> {
        self.metrics.record_event(event.kind());
        match event {
            Event::Befriend(e) => {
                self.network.befriend(e);
                Ok(None)
            }
            Event::Unfriend(e) => {
                self.network.unfriend(e);
                Ok(None)
            }
            Event::Purchase(purchase) => {
                if mode == Mode::Replay {
                    self.detector.observe(&mut self.network, purchase);
                    return Ok(None);
                }

                let assessment = self.detector.process(&mut self.network, purchase);
                self.metrics
                    .record_evaluation(assessment.evaluation.outcome(), assessment.network_size);

                match assessment.flagged(purchase) {
                    Some(flagged) => {
                        info!(
                            id = %flagged.id,
                            amount = %flagged.amount,
                            mean = flagged.mean,
                            sd = flagged.sd,
                            "Anomalous purchase flagged"
                        );
                        self.sink.emit(flagged.clone())?;
                        Ok(Some(flagged))
                    }
                    None => {
                        debug!(id = %purchase.id, "Purchase within network range");
                        Ok(None)
                    }
                }
            }
        }
    }

    pub fn network(&self) -> &SocialNetwork {
        &self.network
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Replace the sink, e.g. once the batch log has been accepted.
    pub fn set_sink(&mut self, sink: Arc<dyn FlagSink>) {
        self.sink = sink;
    }
}
