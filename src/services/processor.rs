//! Stream processor - ingest, aggregate and write in one call
//!
//! `PickingEventProcessorFactory` builds processors bound to a count and a
//! time limit. Each `process` call is an independent run.

use crate::error::{Error, Result};
use crate::infra::config::Config;
use crate::infra::metrics::IngestSummary;
use crate::io::output::{OutputFormat, OutputWriter};
use crate::services::aggregate::aggregate;
use crate::services::ingest::{EventIngestor, IngestOptions};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::info;

/// Source handed to a processor; the caller keeps ownership of cleanup
pub type PickSource = Box<dyn AsyncRead + Send + Unpin>;

/// What one run produced
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    pub pickers: usize,
    pub picks: usize,
    pub bytes_written: usize,
    pub deadline_exceeded: bool,
    pub ingest: IngestSummary,
}

#[async_trait]
pub trait StreamProcessor: Send + Sync {
    /// Read pick events from `source` and write the per-picker document to `sink`
    async fn process(
        &self,
        source: PickSource,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<ProcessSummary>;
}

/// Processor reporting ambient picks per picker
#[derive(Debug, Clone)]
pub struct PickingStreamProcessor {
    options: IngestOptions,
    writer: OutputWriter,
    log_summary: bool,
}

impl PickingStreamProcessor {
    pub fn new(options: IngestOptions) -> Result<Self> {
        if options.max_events == 0 {
            return Err(Error::InvalidArgument("max_events must be positive".to_string()));
        }
        if options.max_time.is_zero() {
            return Err(Error::InvalidArgument("max_time must be positive".to_string()));
        }
        Ok(Self { options, writer: OutputWriter::default(), log_summary: true })
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.writer = OutputWriter::new(format);
        self
    }

    pub fn with_log_summary(mut self, log_summary: bool) -> Self {
        self.log_summary = log_summary;
        self
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }
}

#[async_trait]
impl StreamProcessor for PickingStreamProcessor {
    async fn process(
        &self,
        source: PickSource,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<ProcessSummary> {
        let report = EventIngestor::new(self.options.clone()).run(source).await;
        if self.log_summary {
            report.summary.log();
        }

        let pickers = aggregate(report.events);
        let picks: usize = pickers.iter().map(|p| p.picks.len()).sum();
        info!(pickers = %pickers.len(), picks = %picks, "aggregation_finished");

        let bytes_written = self.writer.write(sink, &pickers).await?;

        Ok(ProcessSummary {
            pickers: pickers.len(),
            picks,
            bytes_written,
            deadline_exceeded: report.deadline_exceeded,
            ingest: report.summary,
        })
    }
}

/// Builds processors for a given count and time limit
#[derive(Debug, Clone, Copy, Default)]
pub struct PickingEventProcessorFactory;

impl PickingEventProcessorFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn create_processor(
        &self,
        max_events: usize,
        max_time: Duration,
    ) -> Result<PickingStreamProcessor> {
        PickingStreamProcessor::new(IngestOptions::new(max_events, max_time))
    }

    /// Processor with limits, pool sizing and output layout taken from `config`
    pub fn from_config(&self, config: &Config) -> Result<PickingStreamProcessor> {
        Ok(PickingStreamProcessor::new(IngestOptions::from_config(config))?
            .with_format(OutputFormat::from_pretty(config.pretty()))
            .with_log_summary(config.log_summary()))
    }
}
