//! Completion handles for backend writes.
//!
//! A cache mutation updates memory synchronously and then issues a write to
//! its backend. The write's completion is returned to the caller as a
//! [`PersistHandle`]; the cache itself never waits on it. Dropping a handle
//! does not undo the in-memory mutation.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use nscache_core::{StorageError, StorageResult};
use tokio::sync::oneshot;

/// Deferred result of a backend write.
///
/// Resolves to `Ok(())` once the backend has persisted the write, or to the
/// backend's error. Backends that persist synchronously hand out an already
/// resolved handle.
#[derive(Debug)]
pub struct PersistHandle {
    inner: HandleState,
}

#[derive(Debug)]
enum HandleState {
    /// Result is available. `None` once it has been yielded.
    Ready(Option<StorageResult<()>>),
    /// Waiting for a [`PersistCompleter`].
    Pending {
        namespace: String,
        rx: oneshot::Receiver<StorageResult<()>>,
    },
}

impl PersistHandle {
    /// A handle that has already resolved with `result`.
    pub fn ready(result: StorageResult<()>) -> Self {
        Self {
            inner: HandleState::Ready(Some(result)),
        }
    }

    /// A handle that has already resolved successfully.
    ///
    /// Used for mutations that turn out to be no-ops.
    pub fn done() -> Self {
        Self::ready(Ok(()))
    }

    /// A handle resolved later through the returned completer.
    pub fn pending(namespace: impl Into<String>) -> (Self, PersistCompleter) {
        let (tx, rx) = oneshot::channel();
        let handle = Self {
            inner: HandleState::Pending {
                namespace: namespace.into(),
                rx,
            },
        };
        (handle, PersistCompleter { tx })
    }

    /// Returns true if awaiting this handle would not block.
    pub fn is_ready(&mut self) -> bool {
        if let HandleState::Pending { namespace, rx } = &mut self.inner {
            let result = match rx.try_recv() {
                Ok(result) => result,
                Err(oneshot::error::TryRecvError::Empty) => return false,
                Err(oneshot::error::TryRecvError::Closed) => Err(StorageError::Abandoned {
                    namespace: namespace.clone(),
                }),
            };
            self.inner = HandleState::Ready(Some(result));
        }
        true
    }
}

impl Future for PersistHandle {
    type Output = StorageResult<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let result = match &mut this.inner {
            HandleState::Ready(result) => return Poll::Ready(result.take().unwrap_or(Ok(()))),
            HandleState::Pending { namespace, rx } => match Pin::new(rx).poll(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Ok(result)) => result,
                Poll::Ready(Err(_)) => Err(StorageError::Abandoned {
                    namespace: namespace.clone(),
                }),
            },
        };
        this.inner = HandleState::Ready(None);
        Poll::Ready(result)
    }
}

/// Resolves a pending [`PersistHandle`].
///
/// Dropping a completer without calling [`complete`](Self::complete)
/// resolves its handle with [`StorageError::Abandoned`].
#[derive(Debug)]
pub struct PersistCompleter {
    tx: oneshot::Sender<StorageResult<()>>,
}

impl PersistCompleter {
    pub fn complete(self, result: StorageResult<()>) {
        // The caller may have dropped the handle; the write still happened.
        let _ = self.tx.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_handle_resolves() {
        assert_eq!(PersistHandle::done().await, Ok(()));

        let err = StorageError::Transaction {
            reason: "disk full".to_string(),
        };
        assert_eq!(PersistHandle::ready(Err(err.clone())).await, Err(err));
    }

    #[tokio::test]
    async fn test_pending_handle_resolves_on_complete() {
        let (mut handle, completer) = PersistHandle::pending("cache");
        assert!(!handle.is_ready());

        completer.complete(Ok(()));
        assert!(handle.is_ready());
        assert_eq!(handle.await, Ok(()));
    }

    #[tokio::test]
    async fn test_dropped_completer_abandons_handle() {
        let (handle, completer) = PersistHandle::pending("inventory");
        drop(completer);

        assert_eq!(
            handle.await,
            Err(StorageError::Abandoned {
                namespace: "inventory".to_string()
            })
        );
    }

    #[test]
    fn test_complete_after_handle_dropped_does_not_panic() {
        let (handle, completer) = PersistHandle::pending("cache");
        drop(handle);
        completer.complete(Ok(()));
    }

    #[tokio::test]
    async fn test_completion_order_is_independent() {
        let (first, first_done) = PersistHandle::pending("cache");
        let (mut second, second_done) = PersistHandle::pending("cache");

        second_done.complete(Ok(()));
        assert!(second.is_ready());

        first_done.complete(Err(StorageError::LockPoisoned));
        assert_eq!(first.await, Err(StorageError::LockPoisoned));
        assert_eq!(second.await, Ok(()));
    }
}
