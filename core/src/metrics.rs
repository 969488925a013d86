use crate::model::EventKind;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationOutcome {
    NotEvaluable,
    Normal,
    Flagged,
}

#[derive(Debug, Clone, Default)]
struct EventCounters {
    befriend: u64,
    unfriend: u64,
    purchase: u64,
    skipped_lines: u64,
}

#[derive(Debug, Clone, Default)]
struct EvaluationCounters {
    not_evaluable: u64,
    normal: u64,
    flagged: u64,
    network_sizes: VecDeque<usize>,
}

struct MetricsState {
    events: EventCounters,
    evaluations: EvaluationCounters,
    max_history: usize,
}

/// Counters shared between the pipeline and whoever reports on it.
#[derive(Clone)]
pub struct PipelineMetrics {
    state: Arc<Mutex<MetricsState>>,
}

impl PipelineMetrics {
    pub fn new(max_history: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MetricsState {
                events: EventCounters::default(),
                evaluations: EvaluationCounters::default(),
                max_history: max_history.max(1),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MetricsState> {
        // Counters stay usable even if a holder panicked mid-update.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_event(&self, kind: EventKind) {
        let mut state = self.lock();
        match kind {
            EventKind::Befriend => state.events.befriend += 1,
            EventKind::Unfriend => state.events.unfriend += 1,
            EventKind::Purchase => state.events.purchase += 1,
        }
    }

    pub fn record_skipped_line(&self) {
        self.lock().events.skipped_lines += 1;
    }

    pub fn record_evaluation(&self, outcome: EvaluationOutcome, network_size: usize) {
        let mut state = self.lock();
        match outcome {
            EvaluationOutcome::NotEvaluable => state.evaluations.not_evaluable += 1,
            EvaluationOutcome::Normal => state.evaluations.normal += 1,
            EvaluationOutcome::Flagged => state.evaluations.flagged += 1,
        }
        state.evaluations.network_sizes.push_back(network_size);
        if state.evaluations.network_sizes.len() > state.max_history {
            state.evaluations.network_sizes.pop_front();
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.lock();
        let e = &state.events;
        let v = &state.evaluations;

        let mut sorted_sizes: Vec<usize> = v.network_sizes.iter().copied().collect();
        sorted_sizes.sort_unstable();

        MetricsSnapshot {
            befriend_events: e.befriend,
            unfriend_events: e.unfriend,
            purchase_events: e.purchase,
            skipped_lines: e.skipped_lines,
            not_evaluable: v.not_evaluable,
            normal: v.normal,
            flagged: v.flagged,
            network_size_p50: percentile(&sorted_sizes, 50.0),
            network_size_p95: percentile(&sorted_sizes, 95.0),
            history_count: v.network_sizes.len(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn percentile(sorted: &[usize], p: f32) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    let idx = ((p / 100.0) * (sorted.len() as f32)).ceil() as usize;
    sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub befriend_events: u64,
    pub unfriend_events: u64,
    pub purchase_events: u64,
    pub skipped_lines: u64,
    pub not_evaluable: u64,
    pub normal: u64,
    pub flagged: u64,
    pub network_size_p50: usize,
    pub network_size_p95: usize,
    pub history_count: usize,
}
