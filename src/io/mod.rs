//! IO modules - getting lines in and the document out
//!
//! This module contains all stream IO:
//! - `line_queue` - Bounded multi-consumer queue with an end-of-input marker
//! - `line_producer` - Reads the input stream into the line queue
//! - `output` - Writes the aggregated JSON document to the sink

pub mod line_producer;
pub mod line_queue;
pub mod output;

// Re-export commonly used types
pub use line_producer::{LineProducer, ProducerExit, ProducerOutcome};
pub use line_queue::{create_line_queue, LineMessage, LineReceiver, LineSender};
pub use output::{OutputFormat, OutputWriter};
