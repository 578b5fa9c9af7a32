//! The lazy-content primitive behind every [`super::Layer`] byte field.
//!
//! A [`LazyBytes`] holds either the bytes outright or a thunk that produces them. The
//! thunk runs at most once: the first `force()` call executes it and memoizes the
//! result, every later caller (including concurrent ones, since the state lives behind
//! a `tokio::sync::Mutex`) gets the memoized bytes without re-running it. This is the
//! mechanism a lazy pull depends on: a layer's blob is never downloaded unless
//! something actually asks for its content.

use crate::error::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Mutex;

type BoxFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>>;
type ThunkFn = Box<dyn FnOnce() -> BoxFuture + Send>;

enum Inner {
    Bytes(Arc<Vec<u8>>),
    Thunk(ThunkFn),
    /// Transient placeholder held only while a thunk is executing, so a panic inside
    /// the thunk can't leave the mutex poisoned with a stale `Thunk` that would re-run.
    Forcing,
}

/// Cheap to clone: clones share the same underlying cell, so forcing through one clone
/// is visible to all others.
#[derive(Clone)]
pub struct LazyBytes(Arc<Mutex<Inner>>);

impl LazyBytes {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        LazyBytes(Arc::new(Mutex::new(Inner::Bytes(Arc::new(bytes)))))
    }

    pub fn from_thunk<F, Fut>(thunk: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<u8>>> + Send + 'static,
    {
        let boxed: ThunkFn = Box::new(move || Box::pin(thunk()));
        LazyBytes(Arc::new(Mutex::new(Inner::Thunk(boxed))))
    }

    /// Returns the bytes, running the thunk on first call. Subsequent calls (from this
    /// clone or any other) return the memoized result without re-running anything.
    pub async fn force(&self) -> Result<Arc<Vec<u8>>> {
        let mut guard = self.0.lock().await;
        match std::mem::replace(&mut *guard, Inner::Forcing) {
            Inner::Bytes(bytes) => {
                *guard = Inner::Bytes(bytes.clone());
                Ok(bytes)
            }
            Inner::Thunk(thunk) => {
                let bytes = thunk().await?;
                let bytes = Arc::new(bytes);
                *guard = Inner::Bytes(bytes.clone());
                Ok(bytes)
            }
            Inner::Forcing => unreachable!("force() cannot be reentered while holding the lock"),
        }
    }

    /// True once the bytes are known without running a thunk, used by tests that
    /// assert a lazy layer was never resolved.
    pub async fn is_resolved(&self) -> bool {
        matches!(&*self.0.lock().await, Inner::Bytes(_))
    }
}

impl std::fmt::Debug for LazyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyBytes").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn bytes_variant_forces_without_a_thunk() {
        let lazy = LazyBytes::from_bytes(vec![1, 2, 3]);
        assert_eq!(*lazy.force().await.unwrap(), vec![1, 2, 3]);
        assert!(lazy.is_resolved().await);
    }

    #[tokio::test]
    async fn thunk_runs_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let lazy = LazyBytes::from_thunk(move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec![9, 9])
            }
        });

        assert!(!lazy.is_resolved().await);
        let a = lazy.force().await.unwrap();
        let b = lazy.force().await.unwrap();
        assert_eq!(*a, vec![9, 9]);
        assert_eq!(*b, vec![9, 9]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
