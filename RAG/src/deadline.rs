//! Process-wide deadline registry (spec.md §4.6).
//!
//! Cancellation is edge-triggered via `tokio_util::sync::CancellationToken`:
//! nothing polls `is_expired`, every suspending operation either awaits the
//! token directly (`select!` against it) or checks it at a natural
//! suspension point. The registry itself is the only process-wide mutable
//! state in the system (spec.md §5), backed by a `DashMap` rather than a
//! `Mutex<HashMap>` since requests touch it without a single owning task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Shared per-request deadline. Cheap to clone; every clone observes the
/// same expiry. `Deadline` itself never owns the entry in the registry —
/// the registry owns it, the orchestrator only reads (spec.md §9).
#[derive(Clone)]
pub struct Deadline {
    pub id: Uuid,
    start_time: Instant,
    timeout: Option<Duration>,
    cancel_token: CancellationToken,
    expired: Arc<AtomicBool>,
}

impl Deadline {
    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::SeqCst)
    }

    /// Milliseconds left before expiry, or `None` if the timer is disabled.
    pub fn remaining_ms(&self) -> Option<u64> {
        let timeout = self.timeout?;
        let elapsed = self.start_time.elapsed();
        Some(timeout.saturating_sub(elapsed).as_millis() as u64)
    }

    /// Clamp a sub-timeout (embedding, LLM, sidecar) to whatever remains on
    /// the global deadline, per spec.md §5 "Timeouts".
    pub fn clamp(&self, sub_timeout: Duration) -> Duration {
        match self.remaining_ms() {
            Some(remaining) => sub_timeout.min(Duration::from_millis(remaining)),
            None => sub_timeout,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// Await either `fut` completing or the deadline firing, whichever
    /// comes first. Returns `None` on cancellation rather than an error —
    /// cancellation is a terminal state, not a failure (spec.md §5).
    pub async fn race<F, T>(&self, fut: F) -> Option<T>
    where
        F: std::future::Future<Output = T>,
    {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

/// Registry keyed by request id (spec.md §4.6). One instance is shared
/// (via `Arc`) across the whole process.
pub struct DeadlineRegistry {
    entries: DashMap<Uuid, Arc<AtomicBool>>,
}

impl DeadlineRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Starts a one-shot timer for `id`. If `timeout_seconds` is `None`
    /// (globalTimer.enabled=false) the deadline never expires.
    pub fn start(&self, id: Uuid, timeout_seconds: Option<f64>) -> Deadline {
        let expired = Arc::new(AtomicBool::new(false));
        self.entries.insert(id, expired.clone());

        let cancel_token = CancellationToken::new();
        let timeout = timeout_seconds.map(Duration::from_secs_f64);

        if let Some(duration) = timeout {
            let expired_flag = expired.clone();
            let token = cancel_token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                expired_flag.store(true, Ordering::SeqCst);
                token.cancel();
            });
        }

        Deadline {
            id,
            start_time: Instant::now(),
            timeout,
            cancel_token,
            expired,
        }
    }

    /// Idempotent: removes the entry. Does not stop an already-fired timer
    /// (it has nothing left to cancel), but a not-yet-fired one simply
    /// becomes unreferenced garbage once its `Deadline` handles drop.
    pub fn complete(&self, id: Uuid) {
        self.entries.remove(&id);
    }
}

impl Default for DeadlineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_timer_never_expires() {
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), None);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!deadline.is_expired());
        assert_eq!(deadline.remaining_ms(), None);
    }

    #[tokio::test]
    async fn expires_after_timeout() {
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), Some(0.01));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(deadline.is_expired());
        assert!(deadline.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn race_returns_none_on_cancellation() {
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), Some(0.01));
        let result = deadline
            .race(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "done"
            })
            .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn race_returns_some_when_faster_than_deadline() {
        let registry = DeadlineRegistry::new();
        let deadline = registry.start(Uuid::new_v4(), Some(5.0));
        let result = deadline.race(async { "done" }).await;
        assert_eq!(result, Some("done"));
    }

    #[test]
    fn complete_is_idempotent() {
        let registry = DeadlineRegistry::new();
        let id = Uuid::new_v4();
        registry.complete(id);
        registry.complete(id);
    }
}
