//! Line producer - reads the input stream into the line queue
//!
//! Reads are async and raced against the cancellation signal, so a deadline
//! interrupts a read that is waiting for data. Whatever the exit path, the
//! producer posts exactly one `LineMessage::End` before returning.

use crate::infra::metrics::IngestStats;
use crate::io::line_queue::LineSender;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Why the producer stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerExit {
    /// `max_events` non-empty lines were pushed
    LimitReached,
    /// The stream ended
    Exhausted,
    /// Cancellation was observed
    Cancelled,
    /// The stream failed; treated as end of input
    ReadError,
    /// Every queue receiver was gone
    QueueClosed,
}

impl ProducerExit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProducerExit::LimitReached => "limit_reached",
            ProducerExit::Exhausted => "exhausted",
            ProducerExit::Cancelled => "cancelled",
            ProducerExit::ReadError => "read_error",
            ProducerExit::QueueClosed => "queue_closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerOutcome {
    pub exit: ProducerExit,
    pub lines_pushed: usize,
    /// Whether the end-of-input marker made it onto the queue
    pub end_posted: bool,
}

/// Single producer feeding the line queue
pub struct LineProducer<R> {
    source: R,
    max_events: usize,
    lines: LineSender,
    stats: Arc<IngestStats>,
}

impl<R> LineProducer<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(source: R, max_events: usize, lines: LineSender, stats: Arc<IngestStats>) -> Self {
        Self { source, max_events, lines, stats }
    }

    /// Read until the limit, end of stream, an error, or cancellation
    pub async fn run(self, mut cancel: watch::Receiver<bool>) -> ProducerOutcome {
        let Self { source, max_events, lines, stats } = self;
        info!(max_events = %max_events, "producer_started");

        let (exit, pushed) = pump(source, max_events, &lines, &stats, &mut cancel).await;

        let end_posted = lines.send_end().await;
        if !end_posted {
            warn!("producer_end_marker_undelivered");
        }

        info!(exit = %exit.as_str(), lines_pushed = %pushed, "producer_finished");
        ProducerOutcome { exit, lines_pushed: pushed, end_posted }
    }
}

async fn pump<R>(
    source: R,
    max_events: usize,
    queue: &LineSender,
    stats: &IngestStats,
    cancel: &mut watch::Receiver<bool>,
) -> (ProducerExit, usize)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut buf: Vec<u8> = Vec::new();
    let mut pushed = 0usize;

    while pushed < max_events {
        buf.clear();
        // read_until is cancel safe; partial bytes stay in `buf`
        let next = tokio::select! {
            biased;
            _ = cancelled(cancel) => return (ProducerExit::Cancelled, pushed),
            result = reader.read_until(b'\n', &mut buf) => result,
        };

        match next {
            Ok(0) => return (ProducerExit::Exhausted, pushed),
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, lines_pushed = %pushed, "producer_read_failed");
                return (ProducerExit::ReadError, pushed);
            }
        }

        let line = decode_line(&buf);
        stats.record_line_read();
        if line.is_empty() {
            stats.record_blank_line();
            continue;
        }

        let sent = tokio::select! {
            biased;
            _ = cancelled(cancel) => return (ProducerExit::Cancelled, pushed),
            result = queue.send_line(line) => result,
        };
        if sent.is_err() {
            warn!("producer_queue_closed");
            return (ProducerExit::QueueClosed, pushed);
        }

        pushed += 1;
        stats.record_line_pushed();
        debug!(lines_pushed = %pushed, queue_depth = %queue.depth(), "line_pushed");
    }

    (ProducerExit::LimitReached, pushed)
}

/// Strip the `\n` or `\r\n` terminator and decode
///
/// Invalid UTF-8 becomes U+FFFD, so the line fails to parse downstream and
/// is dropped like any other malformed line.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Resolves once cancellation is requested; never resolves if the
/// cancelling side is dropped without requesting it
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}
