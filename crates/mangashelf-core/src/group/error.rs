//! Errors returned by job groups and admission throttling.

use thiserror::Error;

/// Returned when work stops because a cancellation token fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Terminal outcome of [`super::JobGroup::wait`] when it is not success.
#[derive(Debug, Error)]
pub enum GroupError {
    /// The parent token was cancelled before every job finished.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
    /// The first job failure observed by the group.
    #[error(transparent)]
    Job(anyhow::Error),
}

impl GroupError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GroupError::Cancelled(_))
    }
}
