//! Shared cancellable deadline for one enrichment run.
//!
//! A single `RunContext` is handed to every concurrent source invocation.
//! It ends either when `cancel()` is called (Ctrl-C, caller abort) or when
//! its deadline passes, whichever happens first. Clones share state, so
//! cancelling any clone ends all of them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::errors::IpEnrichError;

/// Why a context ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Explicit cancellation (signal or caller).
    Cancelled,
    /// The deadline passed.
    DeadlineExceeded,
}

impl CancelReason {
    pub fn into_error(self) -> IpEnrichError {
        match self {
            CancelReason::Cancelled => IpEnrichError::Cancelled,
            CancelReason::DeadlineExceeded => IpEnrichError::Timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    deadline: Option<Instant>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl RunContext {
    /// Context without a deadline; only ends on `cancel()`.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            deadline: None,
            cancel_tx: Arc::new(tx),
        }
    }

    /// Context that ends `timeout` from now. A deadline too far out to be
    /// represented leaves the context without one.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(deadline),
            None => Self::new(),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..Self::new()
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Non-blocking check. Explicit cancellation wins over the deadline.
    pub fn state(&self) -> Option<CancelReason> {
        if *self.cancel_tx.borrow() {
            return Some(CancelReason::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(CancelReason::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.state().is_some()
    }

    /// Resolves once the context has ended.
    pub async fn done(&self) -> CancelReason {
        let mut rx = self.cancel_tx.subscribe();
        let cancelled = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        };

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = cancelled => CancelReason::Cancelled,
                _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                cancelled.await;
                CancelReason::Cancelled
            }
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
