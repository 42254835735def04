//! Bounded multi-consumer line queue
//!
//! A tokio mpsc channel whose receiver is shared by all consumer workers
//! behind an async mutex. End of input travels through the queue itself as
//! `LineMessage::End`, so no line of input can be mistaken for it.

use std::sync::Arc;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, Mutex};

/// Element type of the line queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMessage {
    /// One non-empty input line
    Line(String),
    /// No more lines will arrive
    End,
}

/// Sending half, held by the producer and by every worker (for re-posting `End`)
#[derive(Clone)]
pub struct LineSender {
    tx: mpsc::Sender<LineMessage>,
}

impl LineSender {
    /// Push a line, waiting for capacity
    pub async fn send_line(&self, line: String) -> Result<(), SendError<LineMessage>> {
        self.tx.send(LineMessage::Line(line)).await
    }

    /// Push the end-of-input marker
    ///
    /// Returns false if every receiver is gone.
    pub async fn send_end(&self) -> bool {
        self.tx.send(LineMessage::End).await.is_ok()
    }

    /// Current number of queued messages
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Receiving half, cloned once per worker
#[derive(Clone)]
pub struct LineReceiver {
    rx: Arc<Mutex<mpsc::Receiver<LineMessage>>>,
}

impl LineReceiver {
    /// Take the next message, suspending until one is available
    ///
    /// Returns `None` once every sender has been dropped and the queue is empty.
    pub async fn recv(&self) -> Option<LineMessage> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

/// Create a new line queue
///
/// Capacity is clamped to at least one slot so the final `End` re-post
/// always fits.
pub fn create_line_queue(capacity: usize) -> (LineSender, LineReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LineSender { tx }, LineReceiver { rx: Arc::new(Mutex::new(rx)) })
}
