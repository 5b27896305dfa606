//! Bounded-concurrency job group with first-error cancellation.
//!
//! A [`JobGroup`] runs fallible async jobs on the tokio runtime, keeps at most
//! `limit` of them running at once, and collapses their outcomes into a single
//! result: the first error observed, the parent's cancellation, or success.
//!
//! Jobs are `FnOnce` closures, so everything a job needs is moved into it when
//! it is submitted. Build per-iteration copies (ids, paths, labels) before the
//! `submit` call instead of reading shared loop state from inside the job.
//!
//! ```no_run
//! # async fn demo() -> Result<(), mangashelf_core::group::GroupError> {
//! use mangashelf_core::group::JobGroup;
//! use tokio_util::sync::CancellationToken;
//!
//! let root = CancellationToken::new();
//! let (mut group, _token) = JobGroup::new(&root);
//! group.set_limit(5);
//! for n in 0..20u32 {
//!     group
//!         .submit(move || async move {
//!             tracing::debug!(n, "working");
//!             Ok(())
//!         })
//!         .await;
//! }
//! group.wait().await
//! # }
//! ```

mod error;
mod throttle;


pub use error::{Cancelled, GroupError};
pub use throttle::Throttle;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Single-assignment slot for the first job error.
type ErrorSlot = Arc<Mutex<Option<anyhow::Error>>>;

/// Runs submitted jobs with an optional concurrency ceiling.
///
/// Lifecycle: create with [`JobGroup::new`], optionally [`set_limit`](Self::set_limit),
/// [`submit`](Self::submit) any number of jobs, then [`wait`](Self::wait) once.
/// `wait` consumes the group. Dropping a group without waiting cancels its
/// derived token; jobs already running see the cancellation at their next
/// check and finish on their own.
pub struct JobGroup {
    parent: CancellationToken,
    token: CancellationToken,
    limit: Option<Arc<Semaphore>>,
    tasks: JoinSet<()>,
    live: Arc<AtomicUsize>,
    first_error: ErrorSlot,
    submitted: usize,
}

impl JobGroup {
    /// Create a group bound to `parent`.
    ///
    /// Returns the group and its derived token. The derived token is a child of
    /// `parent`, so it fires when the parent is cancelled, and the group cancels
    /// it itself when the first job fails. Pass it to work that should stop
    /// with the group (catalog calls, nested groups).
    pub fn new(parent: &CancellationToken) -> (Self, CancellationToken) {
        let token = parent.child_token();
        let group = JobGroup {
            parent: parent.clone(),
            token: token.clone(),
            limit: None,
            tasks: JoinSet::new(),
            live: Arc::new(AtomicUsize::new(0)),
            first_error: Arc::new(Mutex::new(None)),
            submitted: 0,
        };
        (group, token)
    }

    /// Set the maximum number of concurrently running jobs; `0` means unbounded.
    ///
    /// # Panics
    ///
    /// Panics if called after the first [`submit`](Self::submit). The ceiling
    /// cannot change while jobs hold slots.
    pub fn set_limit(&mut self, n: usize) {
        assert!(
            self.submitted == 0,
            "JobGroup::set_limit called after {} job(s) were submitted",
            self.submitted
        );
        self.limit = (n > 0).then(|| Arc::new(Semaphore::new(n)));
    }

    /// Number of submitted jobs that have not finished yet.
    pub fn live_jobs(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Schedule `job` to run.
    ///
    /// Does nothing if the group is already cancelled. When the ceiling is
    /// saturated this waits for a free slot, so a fast submitter is held back
    /// instead of queueing unbounded work; if cancellation fires during that
    /// wait the job is dropped. A job that was admitted but observes
    /// cancellation right before starting is skipped.
    pub async fn submit<F, Fut>(&mut self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        if self.token.is_cancelled() {
            tracing::trace!("job group cancelled, dropping submitted job");
            return;
        }

        let permit = match &self.limit {
            Some(limit) => {
                let acquire = Arc::clone(limit).acquire_owned();
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => {
                        tracing::trace!("job group cancelled while waiting for a slot");
                        return;
                    }
                    permit = acquire => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => return,
                    },
                }
            }
            None => None,
        };

        self.submitted += 1;
        self.live.fetch_add(1, Ordering::AcqRel);

        let token = self.token.clone();
        let live = LiveGuard(Arc::clone(&self.live));
        let slot = Arc::clone(&self.first_error);

        self.tasks.spawn(async move {
            let _permit = permit;
            let _live = live;
            if token.is_cancelled() {
                return;
            }
            if let Err(err) = job().await {
                record_first_error(&slot, &token, err);
            }
        });
    }

    /// Block until the parent is cancelled, a job fails, or every job finished.
    ///
    /// Returns [`GroupError::Cancelled`] for parent cancellation, the first job
    /// error otherwise, or `Ok(())` when all jobs succeeded. If the last job
    /// fails, its error is returned rather than success. Jobs still draining
    /// after an early return keep running until they notice the cancellation.
    pub async fn wait(mut self) -> Result<(), GroupError> {
        loop {
            tokio::select! {
                biased;
                _ = self.parent.cancelled() => {
                    return Err(GroupError::Cancelled(Cancelled));
                }
                _ = self.token.cancelled() => {
                    return match self.take_error() {
                        Some(err) => Err(GroupError::Job(err)),
                        None => Err(GroupError::Cancelled(Cancelled)),
                    };
                }
                joined = self.tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(())) => {}
                    Some(Err(err)) if err.is_panic() => {
                        let message = panic_message(err.into_panic());
                        record_first_error(
                            &self.first_error,
                            &self.token,
                            anyhow::anyhow!("job panicked: {}", message),
                        );
                    }
                    Some(Err(_)) => {}
                },
            }
        }

        match self.take_error() {
            Some(err) => Err(GroupError::Job(err)),
            None => Ok(()),
        }
    }

    fn take_error(&self) -> Option<anyhow::Error> {
        lock_slot(&self.first_error).take()
    }
}

impl Drop for JobGroup {
    fn drop(&mut self) {
        self.token.cancel();
        self.tasks.detach_all();
    }
}

/// Decrements the live counter when a job task ends, including on panic.
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn lock_slot(slot: &Mutex<Option<anyhow::Error>>) -> std::sync::MutexGuard<'_, Option<anyhow::Error>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Store `err` if the slot is empty and cancel the group; otherwise discard it.
fn record_first_error(slot: &Mutex<Option<anyhow::Error>>, token: &CancellationToken, err: anyhow::Error) {
    let mut slot = lock_slot(slot);
    if slot.is_none() {
        tracing::debug!(error = %format!("{:#}", err), "job failed, cancelling group");
        *slot = Some(err);
        token.cancel();
    } else {
        tracing::debug!(error = %format!("{:#}", err), "discarding error from sibling job");
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
