use std::sync::atomic::{AtomicBool, Ordering};

use crate::core::{ModemError, Result};

/// Per-modem exclusivity flag guarding radio-state mutations.
///
/// Any sequence that changes shared device state (radio power, band or mode
/// configuration) must hold this lock for its whole lifetime. Acquisition
/// never blocks and never queues: serializing concurrent configuration
/// changes implicitly could reorder user-visible operations, so a second
/// caller gets [`ModemError::Busy`] and retries on its own terms.
#[derive(Debug, Default)]
pub struct OperationLock {
    held: AtomicBool,
}

/// Proof of a successful [`OperationLock::acquire`].
///
/// Not clonable; passed back to [`OperationLock::release`] exactly once.
/// Leaking the token leaves the lock held, which wedges all future
/// mutating operations on the modem.
#[derive(Debug)]
pub struct OperationToken {
    _private: (),
}

impl OperationLock {
    /// Create a released lock.
    pub const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Take the lock, failing fast if it is already held.
    ///
    /// # Errors
    ///
    /// [`ModemError::Busy`] when another operation holds the lock.
    pub fn acquire(&self) -> Result<OperationToken> {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ModemError::Busy);
        }
        Ok(OperationToken { _private: () })
    }

    /// Return the lock.
    ///
    /// # Panics
    ///
    /// Panics if the lock is not held. A release without a matching acquire
    /// means a sequence lost track of lock ownership, which is a bug, not a
    /// runtime condition.
    pub fn release(&self, token: OperationToken) {
        drop(token);
        let was_held = self.held.swap(false, Ordering::AcqRel);
        assert!(was_held, "operation lock released without a matching acquire");
    }

    /// Whether some operation currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}
