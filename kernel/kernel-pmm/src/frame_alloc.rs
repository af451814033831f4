//! Reference-counted physical frame allocator.
//!
//! Serves single 4 KiB frames in O(1) and defers reclamation of shared
//! frames until their last owner releases them. See the crate docs for the
//! state machine; the short version:
//!
//! - [`allocate`](FrameAllocator::allocate) pops a free frame and makes it
//!   single-owner (count exactly 1).
//! - [`add_ref`](FrameAllocator::add_ref) registers one more owner, e.g. a
//!   second page-table mapping created for copy-on-write.
//! - [`free`](FrameAllocator::free) drops one owner; only the drop that
//!   reaches count zero actually returns the frame to the pool.
//!
//! In debug builds (or when explicitly enabled) freed and freshly allocated
//! frames are filled with distinct poison bytes, so a stale read of freed
//! memory looks different from a read of never-initialized fresh memory in
//! a hex dump.

use core::ptr;

use kernel_memory_addresses::{FRAME_SIZE, PhysicalAddress, PhysicalFrame};
use kernel_sync::SpinLock;

use crate::free_list::FreeStack;
use crate::layout::PhysMemoryLayout;
use crate::phys_mapper::PhysMapper;
use crate::refcount::RefCountTable;

/// Byte written over a frame's contents when it returns to the free pool.
pub const POISON_FREE: u8 = 0xDE;

/// Byte written over a frame's contents when it is handed out.
pub const POISON_ALLOC: u8 = 0xA5;

/// The free pool is exhausted.
///
/// The one recoverable failure in this crate: the caller decides whether to
/// fail the requesting operation, retry later, or trigger reclamation
/// elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("out of physical frames")]
pub struct OutOfFrames;

/// Reference-counted allocator over the frames of a [`PhysMemoryLayout`].
///
/// All state is owned by this value; a kernel wanting a single global
/// instance wraps it in its once-init cell at a higher layer. The mapper
/// `M` is only used to reach frame contents for poison fills.
pub struct FrameAllocator<M> {
    layout: PhysMemoryLayout,
    counts: RefCountTable,
    free: SpinLock<FreeStack>,
    mapper: M,
    poison: bool,
}

impl<M: PhysMapper> FrameAllocator<M> {
    /// Build the allocator and release every usable frame into the pool.
    ///
    /// Poison fills follow the build profile: enabled in debug builds,
    /// disabled in release. Use [`with_poison`](Self::with_poison) to pick
    /// explicitly.
    pub fn new(layout: PhysMemoryLayout, mapper: M) -> Self {
        Self::with_poison(layout, mapper, cfg!(debug_assertions))
    }

    /// Like [`new`](Self::new), with poison fills forced on or off.
    ///
    /// Every count is seeded to 1 (the boot identity owns all of physical
    /// memory), then the usable range is released through the ordinary
    /// [`free`](Self::free) path, populating the free stack and driving
    /// the usable counts to 0 with no separate bootstrap logic. Frames
    /// below the kernel image are never released and stay reserved.
    pub fn with_poison(layout: PhysMemoryLayout, mapper: M, poison: bool) -> Self {
        let frames = layout.total_frames();
        let allocator = Self {
            layout,
            counts: RefCountTable::new(frames),
            free: SpinLock::new(FreeStack::new(frames)),
            mapper,
            poison,
        };
        allocator.free_range(layout.first_usable(), layout.phys_top());
        log::info!(
            "pmm: managing {} frames in [{} .. {})",
            layout.managed_frames(),
            layout.first_usable(),
            layout.phys_top()
        );
        allocator
    }

    /// Release every full frame in `[start, end)` into the pool.
    fn free_range(&self, start: PhysicalAddress, end: PhysicalAddress) {
        let mut pa = start.align_up_to_frame();
        while pa.as_u64() + FRAME_SIZE <= end.as_u64() {
            self.free(pa);
            pa += FRAME_SIZE;
        }
    }

    /// Hand out one frame as single-owner fresh memory.
    ///
    /// The returned address is frame-aligned and its reference count is
    /// exactly 1.
    ///
    /// # Errors
    /// [`OutOfFrames`] when the pool is empty.
    pub fn allocate(&self) -> Result<PhysicalAddress, OutOfFrames> {
        let frame = self.free.with_lock(FreeStack::pop).ok_or(OutOfFrames)?;

        // The popped frame is exclusively ours: count 0, off the stack,
        // mapped nowhere. The reset cannot race with anything.
        self.counts.reset_to_one(frame);

        let pa = PhysicalFrame::from_index(frame).base();
        if self.poison {
            // Outside the free-stack lock; a 4 KiB fill is far too long to
            // hold it for.
            unsafe { self.fill(pa, POISON_ALLOC) };
        }
        Ok(pa)
    }

    /// Drop one owner of the frame at `pa`; reclaim it if that was the last.
    ///
    /// # Panics
    /// If `pa` is not frame-aligned, lies below the first usable frame
    /// (inside the kernel image or boot-reserved memory), lies at or above
    /// the top of physical memory, or the frame's count is already zero
    /// (double free). Each of these means a corrupted caller, and
    /// continuing would corrupt the pool.
    pub fn free(&self, pa: PhysicalAddress) {
        assert!(pa.is_frame_aligned(), "pmm: free of unaligned address {pa}");
        assert!(
            pa >= self.layout.first_usable(),
            "pmm: free of reserved address {pa}"
        );
        assert!(
            pa < self.layout.phys_top(),
            "pmm: free of address {pa} beyond physical memory"
        );

        let frame = pa.frame_index();
        if !self.counts.decrement_and_check(frame) {
            // Other owners remain; the frame stays out of the pool.
            return;
        }

        if self.poison {
            // Fill before publishing to the stack, so a dangling reader sees
            // poison rather than its stale contents.
            unsafe { self.fill(pa, POISON_FREE) };
        }

        self.free.with_lock(|stack| stack.push(frame));
    }

    /// Register one more owner of the frame containing `pa` (sharing path,
    /// e.g. an additional page-table mapping to the same frame).
    ///
    /// # Panics
    /// If `pa` lies at or above the top of physical memory, or the frame's
    /// count would overflow.
    pub fn add_ref(&self, pa: PhysicalAddress) {
        assert!(
            pa < self.layout.phys_top(),
            "pmm: add_ref of address {pa} beyond physical memory"
        );
        self.counts.increment(pa.frame_index());
    }

    /// Current owner count of the frame containing `pa`.
    ///
    /// # Panics
    /// If `pa` lies at or above the top of physical memory.
    #[must_use]
    pub fn ref_count(&self, pa: PhysicalAddress) -> u32 {
        assert!(
            pa < self.layout.phys_top(),
            "pmm: ref_count of address {pa} beyond physical memory"
        );
        self.counts.get(pa.frame_index())
    }

    /// Number of frames currently in the free pool.
    #[must_use]
    pub fn free_frames(&self) -> usize {
        self.free.with_lock(|stack| stack.len())
    }

    /// Number of frames in the entire addressable range, reserved included.
    #[must_use]
    pub fn total_frames(&self) -> usize {
        self.counts.len()
    }

    /// The managed range this allocator was built over.
    #[must_use]
    pub const fn layout(&self) -> &PhysMemoryLayout {
        &self.layout
    }

    /// Overwrite the frame at `pa` with `pattern`.
    ///
    /// # Safety
    /// The caller must exclusively own the frame and the mapper must map it
    /// writable for [`FRAME_SIZE`] bytes.
    unsafe fn fill(&self, pa: PhysicalAddress, pattern: u8) {
        // Safety: forwarded to the caller; the mapper translation is valid
        // for the whole frame per the PhysMapper contract.
        unsafe {
            let frame = self.mapper.phys_to_ptr(pa);
            ptr::write_bytes(frame, pattern, FRAME_SIZE as usize);
        }
    }
}
