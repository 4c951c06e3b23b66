// src/chat/checkpoint.rs
// Ordered, best-effort persistence of in-progress assistant content.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::store::ChatStore;
use super::types::ChatMessage;

struct Snapshot {
    seq: u64,
    messages: Vec<ChatMessage>,
}

/// Serializes checkpoint writes for one send operation.
///
/// Snapshots are drained by a single writer task, one in-flight write at a
/// time, and each carries a sequence number; the writer drops anything older
/// than the last snapshot it wrote. Persisted content length is therefore
/// monotonically non-decreasing. Write failures are logged and never
/// retried - the final persist at stream end is the authoritative one.
pub struct CheckpointQueue {
    tx: mpsc::UnboundedSender<Snapshot>,
    writer: JoinHandle<()>,
    seq: u64,
}

impl CheckpointQueue {
    pub fn spawn(
        store: Arc<dyn ChatStore>,
        user_id: String,
        slug: String,
        book_slug: Option<String>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Snapshot>();

        let writer = tokio::spawn(async move {
            let mut last_written = 0u64;
            while let Some(snapshot) = rx.recv().await {
                if snapshot.seq <= last_written {
                    debug!(slug = %slug, seq = snapshot.seq, "dropping stale checkpoint");
                    continue;
                }
                last_written = snapshot.seq;
                if let Err(e) = store
                    .persist(&user_id, &slug, &snapshot.messages, book_slug.as_deref())
                    .await
                {
                    warn!(slug = %slug, seq = snapshot.seq, error = %e, "checkpoint write failed");
                }
            }
        });

        Self { tx, writer, seq: 0 }
    }

    /// Enqueue a snapshot without blocking the stream loop.
    pub fn enqueue(&mut self, messages: Vec<ChatMessage>) {
        self.seq += 1;
        if self.tx.send(Snapshot { seq: self.seq, messages }).is_err() {
            warn!("checkpoint writer gone, dropping snapshot");
        }
    }

    /// Close the queue and wait for pending writes to drain.
    pub async fn finish(self) {
        let CheckpointQueue { tx, writer, .. } = self;
        drop(tx);
        if let Err(e) = writer.await {
            warn!(error = %e, "checkpoint writer task failed");
        }
    }
}
