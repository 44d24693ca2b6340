//! Cancellation and the per-call context handed to prefix resolvers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::secret::SecretStore;

/// Cooperative cancellation signal with an optional deadline.
///
/// Clones share the cancellation flag, so a token handed to another thread
/// can cancel an interpolation that is already running.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that is never cancelled unless `cancel` is called
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that expires after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cancel every clone of this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the token was cancelled or its deadline has passed
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Time left before the deadline, `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Bound an I/O timeout by the remaining deadline
    pub fn bound(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(left) => left.min(timeout),
            None => timeout,
        }
    }

    /// Return a Cancelled error if the token is no longer live
    pub fn check(&self) -> Result<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(Error::cancelled("cancelled by caller"));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(Error::cancelled("deadline exceeded"));
        }
        Ok(())
    }
}

/// Execution context passed to every prefix resolver call
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Cancellation signal; resolvers doing I/O must honor it
    pub cancel: &'a CancelToken,
    /// Secret store, present only if one was configured on the interpolator
    pub secrets: Option<&'a dyn SecretStore>,
}

impl<'a> ResolveContext<'a> {
    /// Create a context without a secret store
    pub fn new(cancel: &'a CancelToken) -> Self {
        Self {
            cancel,
            secrets: None,
        }
    }

    /// Attach a secret store
    pub fn with_secrets(mut self, secrets: &'a dyn SecretStore) -> Self {
        self.secrets = Some(secrets);
        self
    }
}
