//! Line consumer pool - parses queued lines into pick events
//!
//! Each worker takes one message at a time from the shared line queue. On
//! `End` it re-posts the marker for the next sibling and stops, so the queue
//! itself broadcasts shutdown to every worker. Malformed lines are dropped
//! without surfacing an error.

use crate::domain::types::PickEvent;
use crate::infra::metrics::IngestStats;
use crate::io::line_queue::{LineMessage, LineReceiver, LineSender};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Per-worker tallies returned when a worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub parsed: u64,
    pub dropped: u64,
}

/// One consumer worker
pub struct LineWorker {
    id: usize,
    lines_rx: LineReceiver,
    /// For re-posting the end-of-input marker
    lines_tx: LineSender,
    results_tx: mpsc::UnboundedSender<PickEvent>,
    stats: Arc<IngestStats>,
}

impl LineWorker {
    pub fn new(
        id: usize,
        lines_rx: LineReceiver,
        lines_tx: LineSender,
        results_tx: mpsc::UnboundedSender<PickEvent>,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self { id, lines_rx, lines_tx, results_tx, stats }
    }

    /// Run until the end-of-input marker is observed
    pub async fn run(self) -> WorkerReport {
        debug!(worker = %self.id, "line_worker_started");
        let mut report = WorkerReport::default();

        loop {
            let line = match self.lines_rx.recv().await {
                Some(LineMessage::Line(line)) => line,
                Some(LineMessage::End) => {
                    if !self.lines_tx.send_end().await {
                        warn!(worker = %self.id, "line_worker_end_repost_failed");
                    }
                    break;
                }
                None => {
                    warn!(worker = %self.id, "line_queue_closed");
                    break;
                }
            };

            let parse_start = Instant::now();
            let parsed = PickEvent::parse(&line);
            let latency_us = parse_start.elapsed().as_micros() as u64;
            self.stats.record_parse(parsed.is_some(), latency_us);

            match parsed {
                Some(event) => {
                    report.parsed += 1;
                    if self.results_tx.send(event).is_err() {
                        error!(worker = %self.id, "results_queue_closed");
                        break;
                    }
                }
                None => {
                    report.dropped += 1;
                    debug!(worker = %self.id, bytes = %line.len(), "line_dropped_malformed");
                }
            }
        }

        debug!(
            worker = %self.id,
            parsed = %report.parsed,
            dropped = %report.dropped,
            "line_worker_stopped"
        );
        report
    }
}

/// Handles for a running pool
pub struct ConsumerPool {
    handles: Vec<JoinHandle<WorkerReport>>,
}

impl ConsumerPool {
    /// Spawn `workers` workers (at least one) on the current runtime
    pub fn spawn(
        workers: usize,
        lines_rx: LineReceiver,
        lines_tx: LineSender,
        results_tx: mpsc::UnboundedSender<PickEvent>,
        stats: Arc<IngestStats>,
    ) -> Self {
        let workers = workers.max(1);
        let handles = (0..workers)
            .map(|id| {
                let worker = LineWorker::new(
                    id,
                    lines_rx.clone(),
                    lines_tx.clone(),
                    results_tx.clone(),
                    stats.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();

        info!(workers = %workers, "consumer_pool_started");
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to stop
    ///
    /// A worker that fails to join is logged and skipped.
    pub async fn join(self) -> WorkerReport {
        let mut total = WorkerReport::default();
        for (id, handle) in self.handles.into_iter().enumerate() {
            match handle.await {
                Ok(report) => {
                    total.parsed += report.parsed;
                    total.dropped += report.dropped;
                }
                Err(e) => {
                    error!(worker = %id, error = %e, "line_worker_join_failed");
                }
            }
        }
        info!(parsed = %total.parsed, dropped = %total.dropped, "consumer_pool_drained");
        total
    }
}
