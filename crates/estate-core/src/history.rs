//! Per-worker message history

use tokio::sync::Mutex;

use crate::Envelope;

/// In-memory log of the envelopes a single worker has received
///
/// Diagnostic only: nothing in the pipeline reads it to make decisions.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Mutex<Vec<Envelope>>,
}

impl MessageLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received envelope
    pub async fn record(&self, envelope: &Envelope) {
        self.entries.lock().await.push(envelope.clone());
    }

    /// Copy of every recorded envelope, oldest first
    pub async fn snapshot(&self) -> Vec<Envelope> {
        self.entries.lock().await.clone()
    }

    /// Number of recorded envelopes
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Check if nothing has been recorded
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Kinds of the recorded envelopes, oldest first
    pub async fn kinds(&self) -> Vec<String> {
        self.entries
            .lock()
            .await
            .iter()
            .map(|e| e.kind().to_string())
            .collect()
    }
}
