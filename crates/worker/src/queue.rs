//! Deferred mutation queue.
//!
//! Mutating requests that fail while offline are captured here so they
//! can be replayed once connectivity returns. Capture and attempt
//! accounting are implemented; the replay itself is an extension point.
//!
//! TODO: replay pending rows through `Net` with a backoff schedule once
//! the backend's idempotency guarantees for repeated mutations are
//! settled.

use holdfast_core::cache::{MutationStatus, StoreDb};
use holdfast_core::request::Request;
use holdfast_core::Error;

/// Rows that reach this many attempts are abandoned.
pub const MAX_ATTEMPTS: u32 = 5;

/// Result of one queue flush pass.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Rows still pending, marked for another attempt.
    pub deferred: usize,
    /// Rows that exhausted their attempts this pass.
    pub abandoned: usize,
}

/// Queue of mutating requests awaiting replay.
pub struct MutationQueue {
    store: StoreDb,
}

impl MutationQueue {
    pub fn new(store: StoreDb) -> Self {
        Self { store }
    }

    /// Capture a failed mutating request. Non-mutating requests are
    /// ignored and return None.
    pub async fn capture(&self, request: &Request) -> Result<Option<i64>, Error> {
        if !request.method.is_mutation() {
            return Ok(None);
        }
        let id = self
            .store
            .enqueue_mutation(request.method.as_str(), request.url.as_str(), &[], request.body.clone())
            .await?;
        tracing::info!(id, method = %request.method, url = %request.url, "queued mutation for deferred replay");
        Ok(Some(id))
    }

    /// Age the queue: bump every pending row's attempt counter and
    /// abandon rows that have exhausted their attempts. Replay is not
    /// wired up yet (see module docs).
    pub async fn flush(&self) -> Result<FlushReport, Error> {
        let mut report = FlushReport::default();
        for mutation in self.store.pending_mutations().await? {
            if mutation.attempts >= MAX_ATTEMPTS {
                self.store.mark_mutation(mutation.id, MutationStatus::Abandoned).await?;
                tracing::warn!(id = mutation.id, url = %mutation.url, "abandoning mutation after max attempts");
                report.abandoned += 1;
            } else {
                self.store.mark_mutation(mutation.id, MutationStatus::Retrying).await?;
                report.deferred += 1;
            }
        }
        Ok(report)
    }

    /// Mark a mutation replayed successfully and drop its row.
    pub async fn complete(&self, id: i64) -> Result<(), Error> {
        self.store.mark_mutation(id, MutationStatus::Succeeded).await?;
        self.store.delete_mutation(id).await?;
        Ok(())
    }
}
