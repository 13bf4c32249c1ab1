//! Type-level validation locks ("multi-semaphore").

use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};

/// Grants mutually exclusive validation locks keyed by entity-type
/// name, acquired and released as a set.
///
/// Keys are acquired in the lexicographic order the `BTreeSet` yields,
/// never in insertion or hash order. Because every acquirer takes its
/// keys in the same total order, a transaction can only ever wait for
/// keys greater than those it already holds, which rules out circular
/// wait between transactions with overlapping key sets.
///
/// The registry is process-wide shared state; locks are created lazily
/// on first use and live for the registry's lifetime.
#[derive(Debug, Default)]
pub struct TypeLockRegistry {
    held: Mutex<HashSet<String>>,
    freed: Condvar,
}

impl TypeLockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until a lock is held for every key in the set.
    ///
    /// An empty key set returns immediately.
    pub fn acquire(&self, keys: &BTreeSet<String>) {
        let mut held = self.held.lock();
        for key in keys {
            while held.contains(key) {
                self.freed.wait(&mut held);
            }
            held.insert(key.clone());
        }
    }

    /// Like [`acquire`], but gives up at `timeout`.
    ///
    /// All-or-nothing: on timeout any partially acquired subset is
    /// released before returning `false`, so a cancelled caller never
    /// leaves keys held.
    ///
    /// [`acquire`]: TypeLockRegistry::acquire
    #[must_use]
    pub fn try_acquire_for(&self, keys: &BTreeSet<String>, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock();
        let mut taken: Vec<&String> = Vec::new();
        for key in keys {
            while held.contains(key) {
                if self.freed.wait_until(&mut held, deadline).timed_out() {
                    for acquired in taken {
                        held.remove(acquired);
                    }
                    self.freed.notify_all();
                    return false;
                }
            }
            held.insert(key.clone());
            taken.push(key);
        }
        true
    }

    /// Releases all held locks for the set.
    ///
    /// Releasing a key that is not currently held is a no-op, so a
    /// caller may safely pass the full key set after a failed or
    /// partial acquisition.
    pub fn release(&self, keys: &BTreeSet<String>) {
        let mut held = self.held.lock();
        for key in keys {
            held.remove(key);
        }
        self.freed.notify_all();
    }

    /// Whether a lock is currently held for `key`.
    #[must_use]
    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }

    /// Number of keys currently locked.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }
}
