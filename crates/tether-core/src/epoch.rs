//! Allocation epochs: generation counters for staleness detection.
//!
//! Every owner of a shareable allocation holds an `Arc<AllocationEpoch>`.
//! The owner advances the generation whenever its backing store may have
//! moved (any size-changing mutation) and marks the epoch released when it
//! is dropped. Descriptors capture a [`Provenance`] (the epoch plus the
//! generation at capture time); views check it before every access.
//!
//! The check and the subsequent memory access are not atomic with respect
//! to a concurrent resize on another thread. Callers that share a container
//! across threads must serialize mutation and view access themselves.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::AdoptError;

/// Generation counter for one allocation owner.
#[derive(Debug, Default)]
pub struct AllocationEpoch {
    generation: AtomicU64,
    released: AtomicBool,
}

impl AllocationEpoch {
    /// Create a fresh epoch at generation 0.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The current generation.
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Advance to the next generation, returning the new value.
    ///
    /// Every descriptor captured before this call becomes stale.
    pub fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Mark the allocation as destroyed. Irreversible.
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    /// Whether the owner has been destroyed.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

/// The allocation a descriptor was captured from, and when.
///
/// Holding a `Provenance` keeps the epoch (not the payload) alive, so
/// staleness remains detectable after the owner is dropped.
#[derive(Clone)]
pub struct Provenance {
    epoch: Arc<AllocationEpoch>,
    generation: u64,
}

impl Provenance {
    /// Capture the epoch's current generation.
    pub fn capture(epoch: &Arc<AllocationEpoch>) -> Self {
        Self {
            epoch: Arc::clone(epoch),
            generation: epoch.current(),
        }
    }

    /// Rebuild a provenance for a specific generation.
    ///
    /// Used at the C boundary, where the generation travels alongside the
    /// descriptor as a plain integer.
    pub fn at_generation(epoch: &Arc<AllocationEpoch>, generation: u64) -> Self {
        Self {
            epoch: Arc::clone(epoch),
            generation,
        }
    }

    /// The generation recorded at capture time.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The epoch this provenance refers to.
    pub fn epoch(&self) -> &Arc<AllocationEpoch> {
        &self.epoch
    }

    /// Whether two provenances refer to the same allocation owner.
    pub fn same_owner(&self, other: &Provenance) -> bool {
        Arc::ptr_eq(&self.epoch, &other.epoch)
    }

    /// Whether the allocation has moved or been released since capture.
    pub fn is_stale(&self) -> bool {
        self.epoch.is_released() || self.epoch.current() != self.generation
    }

    /// Fail with [`AdoptError::StaleBuffer`] if the allocation has moved
    /// or been released since capture.
    pub fn check(&self) -> Result<(), AdoptError> {
        let current = self.epoch.current();
        let released = self.epoch.is_released();
        if released || current != self.generation {
            return Err(AdoptError::StaleBuffer {
                adopted: self.generation,
                current,
                released,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provenance")
            .field("generation", &self.generation)
            .field("current", &self.epoch.current())
            .field("released", &self.epoch.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_capture_is_valid() {
        let epoch = AllocationEpoch::new();
        let p = Provenance::capture(&epoch);
        assert_eq!(p.generation(), 0);
        assert!(p.check().is_ok());
        assert!(!p.is_stale());
    }

    #[test]
    fn advance_invalidates_earlier_captures() {
        let epoch = AllocationEpoch::new();
        let old = Provenance::capture(&epoch);
        assert_eq!(epoch.advance(), 1);
        let new = Provenance::capture(&epoch);
        assert_eq!(
            old.check(),
            Err(AdoptError::StaleBuffer {
                adopted: 0,
                current: 1,
                released: false
            })
        );
        assert!(new.check().is_ok());
        assert!(old.same_owner(&new));
    }

    #[test]
    fn release_invalidates_everything() {
        let epoch = AllocationEpoch::new();
        let p = Provenance::capture(&epoch);
        epoch.release();
        assert!(p.is_stale());
        assert!(matches!(
            p.check(),
            Err(AdoptError::StaleBuffer { released: true, .. })
        ));
    }

    #[test]
    fn provenance_outlives_owner_handle() {
        let p = {
            let epoch = AllocationEpoch::new();
            let p = Provenance::capture(&epoch);
            epoch.release();
            p
        };
        assert!(p.is_stale());
    }

    #[test]
    fn distinct_epochs_are_distinct_owners() {
        let a = Provenance::capture(&AllocationEpoch::new());
        let b = Provenance::capture(&AllocationEpoch::new());
        assert!(!a.same_owner(&b));
    }
}
