//! Output writer - serializes the aggregated document to the sink
//!
//! The whole document is encoded into memory before the first byte reaches
//! the sink, so an encoding failure leaves the sink untouched.

use crate::domain::response::PickerWithPicks;
use crate::error::Result;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// JSON layout of the output document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Compact,
    Pretty,
}

impl OutputFormat {
    pub fn from_pretty(pretty: bool) -> Self {
        if pretty {
            OutputFormat::Pretty
        } else {
            OutputFormat::Compact
        }
    }

    /// Encode `value` into a fresh buffer
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let bytes = match self {
            OutputFormat::Compact => serde_json::to_vec(value)?,
            OutputFormat::Pretty => serde_json::to_vec_pretty(value)?,
        };
        Ok(bytes)
    }
}

/// Writes the output document in one step
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Encode and write `pickers`, then flush. Returns the bytes written.
    pub async fn write<W>(&self, sink: &mut W, pickers: &[PickerWithPicks]) -> Result<usize>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let buffer = self.format.encode(pickers)?;
        debug!(bytes = %buffer.len(), pickers = %pickers.len(), "output_encoded");

        sink.write_all(&buffer).await?;
        sink.flush().await?;

        info!(bytes = %buffer.len(), pickers = %pickers.len(), "output_written");
        Ok(buffer.len())
    }
}
