//! In-process job table with one-shot completion delivery.
//!
//! Each job record carries the list of push-channel subscribers waiting on
//! it. Settling a job and draining its subscribers happen under the same
//! write lock, so a subscriber registered concurrently either lands in the
//! list before the drain or observes the terminal state and is answered
//! immediately. Nobody is left waiting on a job that has already finished.

use std::collections::HashMap;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use kidstory_core::error::CoreError;
use kidstory_core::job::{Job, JobId, JobOutcome, JobStatus};
use tokio::sync::{oneshot, RwLock};
use tokio::time::Instant;

/// Bookkeeping for a single job.
struct JobEntry {
    job: Job,
    /// Monotonic settle time, used for retention.
    settled_at: Option<Instant>,
    waiters: Vec<oneshot::Sender<JobOutcome>>,
}

impl JobEntry {
    fn is_expired(&self, now: Instant, retention: Duration) -> bool {
        self.settled_at
            .is_some_and(|at| now.saturating_duration_since(at) >= retention)
    }
}

/// Owns every job record and its push-channel subscribers.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared between request handlers and background generation tasks.
pub struct JobTracker {
    entries: RwLock<HashMap<JobId, JobEntry>>,
    /// How long terminal jobs remain pollable.
    retention: Duration,
    /// How long a push channel waits before closing without an event.
    push_timeout: Duration,
}

impl JobTracker {
    pub fn new(retention: Duration, push_timeout: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention,
            push_timeout,
        }
    }

    /// Register a new pending job and return its id.
    pub async fn create(&self, prompt: &str, model: &str) -> JobId {
        let job = Job::new(prompt, model);
        let id = job.id;
        self.entries.write().await.insert(
            id,
            JobEntry {
                job,
                settled_at: None,
                waiters: Vec::new(),
            },
        );
        id
    }

    /// Observe a job without blocking on its completion.
    ///
    /// Terminal jobs keep answering with the same outcome until their
    /// retention window passes; after that (or for ids never issued) the
    /// answer is [`JobStatus::Unknown`].
    pub async fn poll_status(&self, id: JobId) -> JobStatus {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        match entries.get(&id) {
            None => JobStatus::Unknown,
            Some(entry) if entry.is_expired(now, self.retention) => {
                entries.remove(&id);
                tracing::debug!(job_id = %id, "Evicted expired job on poll");
                JobStatus::Unknown
            }
            Some(entry) => entry.job.status(),
        }
    }

    /// Copy of the job record, if it is still retained.
    pub async fn snapshot(&self, id: JobId) -> Option<Job> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(&id)
            .filter(|entry| !entry.is_expired(now, self.retention))
            .map(|entry| entry.job.clone())
    }

    /// Subscribe to the job's terminal outcome.
    ///
    /// The returned channel yields the outcome at most once. A job that has
    /// already finished answers immediately.
    pub async fn open_push_channel(&self, id: JobId) -> Result<PushChannel, CoreError> {
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let entry = entries
            .get_mut(&id)
            .filter(|entry| !entry.is_expired(now, self.retention))
            .ok_or_else(|| not_found(id))?;

        match entry.job.outcome() {
            Some(outcome) => {
                let _ = tx.send(outcome);
            }
            None => {
                // Drop handles whose channel already timed out.
                entry.waiters.retain(|w| !w.is_closed());
                entry.waiters.push(tx);
            }
        }

        Ok(PushChannel {
            rx,
            timeout: self.push_timeout,
        })
    }

    /// Settle a pending job and notify its subscribers.
    ///
    /// Returns how many open push channels received the outcome. Fails with
    /// `NotFound` for unknown ids and `Conflict` when the job has already
    /// finished; neither case changes any state.
    pub async fn complete(&self, id: JobId, outcome: JobOutcome) -> Result<usize, CoreError> {
        let mut entries = self.entries.write().await;
        let entry = entries.get_mut(&id).ok_or_else(|| not_found(id))?;

        entry.job.settle(&outcome)?;
        entry.settled_at = Some(Instant::now());

        let delivered = std::mem::take(&mut entry.waiters)
            .into_iter()
            .filter(|tx| !tx.is_closed())
            .map(|tx| tx.send(outcome.clone()).is_ok())
            .filter(|sent| *sent)
            .count();

        tracing::info!(
            job_id = %id,
            state = ?outcome.state(),
            delivered,
            "Job settled",
        );
        Ok(delivered)
    }

    /// Remove terminal jobs whose retention window has passed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.retention));
        before - entries.len()
    }

    /// Number of retained jobs, pending or terminal.
    pub async fn job_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Number of push channels still waiting on `id`.
    pub async fn subscriber_count(&self, id: JobId) -> usize {
        self.entries
            .read()
            .await
            .get(&id)
            .map_or(0, |entry| entry.waiters.iter().filter(|w| !w.is_closed()).count())
    }
}

fn not_found(id: JobId) -> CoreError {
    CoreError::NotFound {
        entity: "Job",
        id: id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// PushChannel
// ---------------------------------------------------------------------------

/// Receiving end of a job subscription.
#[derive(Debug)]
pub struct PushChannel {
    rx: oneshot::Receiver<JobOutcome>,
    timeout: Duration,
}

impl PushChannel {
    /// Wait for the outcome; `None` if the idle timeout fires first.
    pub async fn recv(self) -> Option<JobOutcome> {
        match tokio::time::timeout(self.timeout, self.rx).await {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// A stream of zero or one outcomes that ends after delivery or timeout.
    pub fn into_stream(self) -> impl Stream<Item = JobOutcome> + Send + 'static {
        stream::once(self.recv()).filter_map(futures::future::ready)
    }
}
