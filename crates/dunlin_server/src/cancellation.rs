//! Cooperative cancellation with owner→child linking.
//!
//! A worker owns a top-level [`CancellationSource`]; each work item owns a
//! child source linked to it. Cancelling a source cancels every descendant,
//! while cancelling a child leaves its siblings running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// The error observed at a cancellation check.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cancelled;

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("operation was cancelled")
    }
}

impl std::error::Error for Cancelled {}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let children = std::mem::take(&mut *self.children.lock().unwrap());
        for child in children {
            if let Some(child) = child.upgrade() {
                child.cancel();
            }
        }
    }
}

/// Owns the right to cancel; hand out [`CancellationToken`]s to workers.
///
/// Clones share the same cancellation state.
#[derive(Clone, Debug, Default)]
pub struct CancellationSource {
    inner: Arc<Inner>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new source cancelled whenever `self` is cancelled.
    pub fn child_source(&self) -> CancellationSource {
        let child = CancellationSource::new();
        if self.is_cancelled() {
            child.cancel();
        } else {
            self.inner
                .children
                .lock()
                .unwrap()
                .push(Arc::downgrade(&child.inner));
        }
        child
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }
}

/// A cheap handle observing (but never triggering) cancellation.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// A token that can never be cancelled.
    pub fn never() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Checked at every syntax-node and I/O boundary of long-running work.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CancellationSource;

    #[test]
    fn cancel_propagates_to_children() {
        let parent = CancellationSource::new();
        let child = parent.child_source();
        let grandchild = child.child_source();

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn cancelling_a_child_spares_its_sibling() {
        let parent = CancellationSource::new();
        let first = parent.child_source();
        let second = parent.child_source();

        first.cancel();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn child_of_cancelled_source_starts_cancelled() {
        let parent = CancellationSource::new();
        parent.cancel();
        assert!(parent.child_source().is_cancelled());
    }

    #[test]
    fn token_check() {
        let source = CancellationSource::new();
        let token = source.token();
        assert!(token.check().is_ok());
        source.cancel();
        assert!(token.check().is_err());
    }
}
