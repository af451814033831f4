//! Per-frame reference counts.
//!
//! One counter and one lock per physical frame, covering the entire
//! addressable range. The count is the number of live owners (page-table
//! mappings, pinned kernel users); the free path reclaims a frame only on
//! the decrement that reaches zero.
//!
//! Locks here are per frame, so counts of distinct frames update fully in
//! parallel. A slot's lock is held only for the read-modify-write of its
//! counter, never across any free-list operation.

use alloc::boxed::Box;
use alloc::vec::Vec;
use kernel_sync::SpinLock;

pub(crate) struct RefCountTable {
    slots: Box<[SpinLock<u32>]>,
}

impl RefCountTable {
    /// One slot per frame, every count seeded to 1: at boot, every frame is
    /// owned by the boot identity until explicitly released.
    pub(crate) fn new(frames: usize) -> Self {
        let slots = (0..frames)
            .map(|_| SpinLock::new(1))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { slots }
    }

    /// Add an owner to `frame`.
    ///
    /// # Panics
    /// On counter overflow. Wrapping silently would let a later decrement
    /// reclaim a frame that still has ~4 billion owners, so overflow is a
    /// contract violation, not an arithmetic detail.
    pub(crate) fn increment(&self, frame: usize) {
        self.slots[frame].with_lock(|count| {
            let Some(next) = count.checked_add(1) else {
                panic!("pmm: reference count overflow for frame {frame}");
            };
            *count = next;
        });
    }

    /// Drop an owner from `frame`; returns `true` if that was the last one.
    ///
    /// # Panics
    /// If the count is already zero: a double free, or a release of a frame
    /// nobody owned.
    pub(crate) fn decrement_and_check(&self, frame: usize) -> bool {
        self.slots[frame].with_lock(|count| {
            assert!(
                *count > 0,
                "pmm: reference count underflow for frame {frame} (double free?)"
            );
            *count -= 1;
            *count == 0
        })
    }

    /// Make `frame` single-owner fresh memory.
    ///
    /// Only valid while the caller exclusively holds the frame (just popped
    /// from the free stack, not yet published anywhere).
    pub(crate) fn reset_to_one(&self, frame: usize) {
        self.slots[frame].with_lock(|count| *count = 1);
    }

    /// Current owner count of `frame`.
    pub(crate) fn get(&self, frame: usize) -> u32 {
        self.slots[frame].with_lock(|count| *count)
    }

    pub(crate) const fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub(crate) fn set(&self, frame: usize, value: u32) {
        self.slots[frame].with_lock(|count| *count = value);
    }
}
