//! Callback reentrancy and thread checks
//!
//! Render and input callbacks assume a single host thread that never
//! re-enters them. These guards make that assumption observable instead of
//! silently relying on it.

use std::cell::Cell;
use std::sync::OnceLock;
use std::thread::ThreadId;

thread_local! {
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Marks the current thread as inside a toolbox callback.
///
/// Only one guard per thread can exist at a time; a nested
/// [`ReentrancyGuard::enter`] returns `None`.
#[derive(Debug)]
pub struct ReentrancyGuard {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ReentrancyGuard {
    pub fn enter() -> Option<Self> {
        DEPTH.with(|depth| {
            if depth.get() > 0 {
                return None;
            }
            depth.set(1);
            Some(Self {
                _not_send: std::marker::PhantomData,
            })
        })
    }

    pub fn is_active() -> bool {
        DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(0));
    }
}

/// Remembers the first thread that called in
#[derive(Debug, Default)]
pub struct ThreadAffinity {
    owner: OnceLock<ThreadId>,
}

impl ThreadAffinity {
    pub const fn new() -> Self {
        Self {
            owner: OnceLock::new(),
        }
    }

    /// Returns `false` when called from a thread other than the first one
    pub fn check(&self, what: &str) -> bool {
        let current = std::thread::current().id();
        let owner = *self.owner.get_or_init(|| current);
        if owner != current {
            tracing::warn!(
                "{} called from {:?}, expected render thread {:?}",
                what,
                current,
                owner
            );
            return false;
        }
        true
    }

    pub fn owner(&self) -> Option<ThreadId> {
        self.owner.get().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_enter_is_refused() {
        let outer = ReentrancyGuard::enter();
        assert!(outer.is_some());
        assert!(ReentrancyGuard::enter().is_none());
        drop(outer);
        assert!(!ReentrancyGuard::is_active());
        assert!(ReentrancyGuard::enter().is_some());
    }

    #[test]
    fn test_affinity_pins_first_thread() {
        let affinity = std::sync::Arc::new(ThreadAffinity::new());
        assert!(affinity.check("frame"));
        assert!(affinity.check("frame"));

        let other = affinity.clone();
        let result = std::thread::spawn(move || other.check("frame")).join().unwrap();
        assert!(!result);
    }
}
