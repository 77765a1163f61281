//! Request-scoped cancellation and deadlines
//!
//! A [`Context`] is handed to every lifecycle operation. Long waits (task
//! polling in particular) race their sleeps and requests against
//! [`Context::cancelled`], so cancelling the context or reaching its deadline
//! interrupts them promptly.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};

#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_deadline(None)
    }

    /// Fresh context that is done once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Some(Instant::now() + timeout))
    }

    fn with_deadline(deadline: Option<Instant>) -> Self {
        let (done_tx, done) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline,
                done,
                done_tx,
            }),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    pub fn deadline_exceeded(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// True once [`cancel`](Self::cancel) was called or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow() || self.deadline_exceeded()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Resolves when work done on behalf of this context should stop.
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();

        loop {
            if *done.borrow_and_update() {
                return;
            }

            match self.inner.deadline {
                Some(deadline) => {
                    tokio::select! {
                        changed = done.changed() => {
                            // The sender lives as long as the context.
                            if changed.is_err() {
                                time::sleep_until(deadline).await;
                                return;
                            }
                        }
                        _ = time::sleep_until(deadline) => return,
                    }
                }
                None => {
                    if done.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
