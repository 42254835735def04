//! Ingestion orchestrator - bounded read of the pick stream
//!
//! Owns both queues, runs the producer under the `max_time` deadline and the
//! consumer pool without one, and hands back everything parsed.
//!
//! Phases per run:
//! `NotStarted → ProducerRunning → {ProducerDeadlineExceeded | ProducerCompleted}
//!  → ConsumersDraining → Done`
//!
//! After a deadline the orchestrator still waits for the workers to drain
//! lines already queued, with no second deadline. A very slow parse can
//! therefore stretch a run past `max_time`.

use crate::domain::types::PickEvent;
use crate::infra::config::Config;
use crate::infra::metrics::{IngestStats, IngestSummary};
use crate::io::line_producer::{LineProducer, ProducerOutcome};
use crate::io::line_queue::create_line_queue;
use crate::services::consumer_pool::ConsumerPool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncRead;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

const DEFAULT_LINE_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    NotStarted,
    ProducerRunning,
    ProducerDeadlineExceeded,
    ProducerCompleted,
    ConsumersDraining,
    Done,
}

impl IngestPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestPhase::NotStarted => "not_started",
            IngestPhase::ProducerRunning => "producer_running",
            IngestPhase::ProducerDeadlineExceeded => "producer_deadline_exceeded",
            IngestPhase::ProducerCompleted => "producer_completed",
            IngestPhase::ConsumersDraining => "consumers_draining",
            IngestPhase::Done => "done",
        }
    }
}

/// Limits and sizing for one ingestion run
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub max_events: usize,
    pub max_time: Duration,
    pub workers: usize,
    pub line_queue_capacity: usize,
}

impl IngestOptions {
    /// Options with one worker per available processing unit
    pub fn new(max_events: usize, max_time: Duration) -> Self {
        let workers = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self { max_events, max_time, workers, line_queue_capacity: DEFAULT_LINE_QUEUE_CAPACITY }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_events: config.max_events(),
            max_time: config.max_time(),
            workers: config.effective_workers(),
            line_queue_capacity: config.line_queue_capacity(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_line_queue_capacity(mut self, capacity: usize) -> Self {
        self.line_queue_capacity = capacity;
        self
    }
}

/// Result of one ingestion run
#[derive(Debug)]
pub struct IngestReport {
    /// Parsed events in arbitrary order
    pub events: Vec<PickEvent>,
    /// Producer outcome, `None` if the producer task failed to join
    pub producer: Option<ProducerOutcome>,
    pub deadline_exceeded: bool,
    pub summary: IngestSummary,
    pub elapsed: Duration,
}

/// Runs producer and consumer pool for a single input stream
pub struct EventIngestor {
    options: IngestOptions,
    phase: IngestPhase,
}

impl EventIngestor {
    pub fn new(options: IngestOptions) -> Self {
        Self { options, phase: IngestPhase::NotStarted }
    }

    pub fn phase(&self) -> IngestPhase {
        self.phase
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    fn transition(&mut self, next: IngestPhase) {
        debug!(from = %self.phase.as_str(), to = %next.as_str(), "ingest_phase");
        self.phase = next;
    }

    /// Read `source` until the count limit, end of stream, or the deadline,
    /// then wait for every queued line to be parsed
    pub async fn run<R>(&mut self, source: R) -> IngestReport
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let started = Instant::now();
        let stats = Arc::new(IngestStats::new());
        let (lines_tx, lines_rx) = create_line_queue(self.options.line_queue_capacity);
        let (results_tx, mut results_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let producer =
            LineProducer::new(source, self.options.max_events, lines_tx.clone(), stats.clone());
        let mut producer_task = tokio::spawn(producer.run(cancel_rx));
        self.transition(IngestPhase::ProducerRunning);

        let pool = ConsumerPool::spawn(
            self.options.workers,
            lines_rx,
            lines_tx.clone(),
            results_tx,
            stats.clone(),
        );

        let mut deadline_exceeded = false;
        let joined = match tokio::time::timeout(self.options.max_time, &mut producer_task).await {
            Ok(joined) => {
                self.transition(IngestPhase::ProducerCompleted);
                joined
            }
            Err(_) => {
                deadline_exceeded = true;
                info!(max_time_ms = %self.options.max_time.as_millis(), "producer_deadline_exceeded");
                self.transition(IngestPhase::ProducerDeadlineExceeded);
                if cancel_tx.send(true).is_err() {
                    debug!("producer_already_stopped");
                }
                producer_task.await
            }
        };

        let producer = match joined {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(error = %e, "producer_join_failed");
                None
            }
        };

        // Workers only stop on the end marker; post it here if the producer could not
        if !producer.is_some_and(|outcome| outcome.end_posted) {
            warn!("posting_end_marker_for_producer");
            lines_tx.send_end().await;
        }
        drop(lines_tx);

        self.transition(IngestPhase::ConsumersDraining);
        pool.join().await;

        let mut events = Vec::new();
        while let Some(event) = results_rx.recv().await {
            events.push(event);
        }
        stats.record_events_collected(events.len() as u64);
        self.transition(IngestPhase::Done);

        let elapsed = started.elapsed();
        info!(
            events = %events.len(),
            exit = %producer.map(|p| p.exit.as_str()).unwrap_or("join_failed"),
            deadline_exceeded = %deadline_exceeded,
            elapsed_ms = %elapsed.as_millis(),
            "ingest_finished"
        );

        IngestReport {
            events,
            producer,
            deadline_exceeded,
            summary: stats.snapshot(),
            elapsed,
        }
    }
}

/// Read pick events from `source` with the given count and time limits
pub async fn read_events<R>(source: R, max_events: usize, max_time: Duration) -> Vec<PickEvent>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    EventIngestor::new(IngestOptions::new(max_events, max_time)).run(source).await.events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::line_producer::ProducerExit;
    use std::io::Cursor;
    use tokio::io::AsyncWriteExt;

    fn pick_line(id: u32, zone: &str) -> String {
        format!(
            r#"{{"id":"{id}","timestamp":"2018-12-20T11:50:{:02}Z","picker":{{"id":"14","name":"Joris","active_since":"2018-09-20T08:20:00Z"}},"article":{{"id":"13473","name":"ACME Bananas","temperature_zone":"{zone}"}},"quantity":2}}"#,
            id % 60
        )
    }

    fn stream_of(lines: &[String]) -> Cursor<Vec<u8>> {
        Cursor::new(lines.join("\n").into_bytes())
    }

    #[tokio::test]
    async fn test_reads_all_lines_until_exhausted() {
        let lines: Vec<String> = (0..20).map(|i| pick_line(i, "ambient")).collect();
        let mut ingestor = EventIngestor::new(IngestOptions::new(100, Duration::from_secs(5)));
        assert_eq!(ingestor.phase(), IngestPhase::NotStarted);

        let report = ingestor.run(stream_of(&lines)).await;

        assert_eq!(report.events.len(), 20);
        assert!(!report.deadline_exceeded);
        assert_eq!(report.producer.map(|p| p.exit), Some(ProducerExit::Exhausted));
        assert_eq!(report.summary.events_collected, 20);
        assert_eq!(ingestor.phase(), IngestPhase::Done);
    }

    #[tokio::test]
    async fn test_count_limit_with_blank_lines() {
        let mut lines = Vec::new();
        for i in 0..10 {
            lines.push(pick_line(i, "ambient"));
            lines.push(String::new());
        }

        let report = EventIngestor::new(IngestOptions::new(5, Duration::from_secs(5)))
            .run(stream_of(&lines))
            .await;

        assert_eq!(report.events.len(), 5);
        assert_eq!(report.producer.map(|p| p.exit), Some(ProducerExit::LimitReached));
        assert_eq!(report.summary.lines_pushed, 5);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_dropped() {
        let lines = vec![pick_line(1, "ambient"), "{not json".to_string(), pick_line(2, "chilled")];

        let events = read_events(stream_of(&lines), 100, Duration::from_secs(5)).await;

        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_returns_early_when_stream_ends() {
        let lines = vec![pick_line(1, "ambient")];
        let started = Instant::now();

        let report = EventIngestor::new(IngestOptions::new(100, Duration::from_secs(5)))
            .run(stream_of(&lines))
            .await;

        assert_eq!(report.events.len(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_deadline_cancels_open_stream() {
        let (mut writer, reader) = tokio::io::duplex(4096);
        let input = format!("{}\n{}\n", pick_line(1, "ambient"), pick_line(2, "ambient"));
        writer.write_all(input.as_bytes()).await.unwrap();

        let mut ingestor =
            EventIngestor::new(IngestOptions::new(100, Duration::from_millis(300)).with_workers(2));
        let started = Instant::now();
        let report = ingestor.run(reader).await;
        let elapsed = started.elapsed();

        assert!(report.deadline_exceeded);
        assert_eq!(report.producer.map(|p| p.exit), Some(ProducerExit::Cancelled));
        assert_eq!(report.events.len(), 2);
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_secs(1));
        drop(writer);
    }

    #[tokio::test]
    async fn test_small_queue_does_not_deadlock() {
        let lines: Vec<String> = (0..200).map(|i| pick_line(i, "ambient")).collect();
        let options = IngestOptions::new(1000, Duration::from_secs(5))
            .with_workers(3)
            .with_line_queue_capacity(1);

        let report = EventIngestor::new(options).run(stream_of(&lines)).await;

        assert_eq!(report.events.len(), 200);
    }

    /// Source whose first read panics, failing the producer task
    struct PanickingSource;

    impl AsyncRead for PanickingSource {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            panic!("source exploded");
        }
    }

    #[tokio::test]
    async fn test_producer_failure_still_finishes_run() {
        let mut ingestor =
            EventIngestor::new(IngestOptions::new(100, Duration::from_secs(5)).with_workers(3));

        let report = tokio::time::timeout(Duration::from_secs(3), ingestor.run(PanickingSource))
            .await
            .expect("workers should stop on the fallback end marker");

        assert!(report.producer.is_none());
        assert!(report.events.is_empty());
        assert!(!report.deadline_exceeded);
        assert_eq!(ingestor.phase(), IngestPhase::Done);
    }

    #[test]
    fn test_options_from_config() {
        let config = Config::default().with_max_events(7).with_max_time_ms(1500).with_workers(2);
        let options = IngestOptions::from_config(&config);
        assert_eq!(options.max_events, 7);
        assert_eq!(options.max_time, Duration::from_millis(1500));
        assert_eq!(options.workers, 2);
        assert_eq!(options.line_queue_capacity, 1024);
    }
}
