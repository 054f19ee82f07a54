use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use crate::errors::StoreError;

/// Cancellation and deadline carried alongside a query.
///
/// The query builder hands it to the [`Collection`](crate::store::Collection)
/// untouched; store drivers decide how to honour it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancel: Option<CancelToken>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub const fn background() -> Self {
        Self {
            deadline: None,
            cancel: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout(timeout)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// The error an operation started now would fail with, if any.
    pub fn err(&self) -> Option<StoreError> {
        if self.is_cancelled() {
            return Some(StoreError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(StoreError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Runs `fut` unless the context is already done, bounding it by the deadline.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                tokio::time::timeout(remaining, fut)
                    .await
                    .map_err(|_| StoreError::DeadlineExceeded)?
            }
            None => fut.await,
        }
    }
}

/// Shared flag used to cancel every context holding a clone of it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
