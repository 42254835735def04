//! Services - the processing pipeline
//!
//! This module contains the pipeline stages and their wiring:
//! - `consumer_pool` - Workers parsing queued lines into pick events
//! - `ingest` - Orchestrates producer and pool under the time limit
//! - `aggregate` - Groups, filters and orders picks per picker
//! - `processor` - Factory and processor running one full pass

pub mod aggregate;
pub mod consumer_pool;
pub mod ingest;
pub mod processor;

// Re-export commonly used types
pub use aggregate::aggregate;
pub use consumer_pool::{ConsumerPool, LineWorker, WorkerReport};
pub use ingest::{read_events, EventIngestor, IngestOptions, IngestPhase, IngestReport};
pub use processor::{
    PickSource, PickingEventProcessorFactory, PickingStreamProcessor, ProcessSummary,
    StreamProcessor,
};
