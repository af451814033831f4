//! Managed physical range, validated once at construction.
//!
//! The loader/linker layer knows where the kernel image ends and where
//! physical memory tops out; this module turns that pair of boot facts into
//! a checked value the allocator can trust. Keeping it a plain owned value
//! (instead of file-scope constants) lets tests run the allocator over tiny
//! synthetic ranges.

use kernel_memory_addresses::{FRAME_SIZE, PhysicalAddress};

/// The physical range the allocator manages.
///
/// Frames in `[0, first_usable)` exist in the allocator's tables (so their
/// reference counts can be tracked) but are never handed out: they back the
/// kernel image and whatever the boot layer reserved below it. Frames in
/// `[first_usable, phys_top)` cycle through the free pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysMemoryLayout {
    first_usable: PhysicalAddress,
    phys_top: PhysicalAddress,
}

impl PhysMemoryLayout {
    /// Validate the boot-provided range.
    ///
    /// `kernel_end` is rounded up to the next frame boundary; `phys_top`
    /// must already be frame-aligned (it is a range end, not an address in
    /// use) and the range must contain at least one full usable frame.
    ///
    /// # Errors
    /// [`LayoutError`] if `phys_top` is misaligned or the usable range is
    /// empty.
    pub const fn new(
        kernel_end: PhysicalAddress,
        phys_top: PhysicalAddress,
    ) -> Result<Self, LayoutError> {
        if !phys_top.is_frame_aligned() {
            return Err(LayoutError::UnalignedTop);
        }
        let first_usable = kernel_end.align_up_to_frame();
        if first_usable.as_u64() + FRAME_SIZE > phys_top.as_u64() {
            return Err(LayoutError::NoUsableFrames);
        }
        Ok(Self {
            first_usable,
            phys_top,
        })
    }

    /// Base of the first frame the allocator may hand out.
    #[inline]
    #[must_use]
    pub const fn first_usable(&self) -> PhysicalAddress {
        self.first_usable
    }

    /// Exclusive top of physical memory.
    #[inline]
    #[must_use]
    pub const fn phys_top(&self) -> PhysicalAddress {
        self.phys_top
    }

    /// Number of frames in the entire addressable range `[0, phys_top)`.
    ///
    /// Per-frame tables are sized by this, reserved frames included.
    #[inline]
    #[must_use]
    pub const fn total_frames(&self) -> usize {
        self.phys_top.frame_index()
    }

    /// Number of frames the allocator actually hands out.
    #[inline]
    #[must_use]
    pub const fn managed_frames(&self) -> usize {
        self.phys_top.frame_index() - self.first_usable.frame_index()
    }

    /// Whether `pa` lies inside the managed (allocatable) range.
    #[inline]
    #[must_use]
    pub const fn is_managed(&self, pa: PhysicalAddress) -> bool {
        pa.as_u64() >= self.first_usable.as_u64() && pa.as_u64() < self.phys_top.as_u64()
    }
}

/// Rejected boot-layer range description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The top of physical memory must be a frame boundary.
    #[error("top of physical memory is not frame-aligned")]
    UnalignedTop,
    /// No full frame fits between the kernel image and the top of memory.
    #[error("no usable frames between kernel end and top of physical memory")]
    NoUsableFrames,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_kernel_end_up() {
        let layout = PhysMemoryLayout::new(
            PhysicalAddress::new(0x1234),
            PhysicalAddress::new(8 * FRAME_SIZE),
        )
        .unwrap();
        assert_eq!(layout.first_usable(), PhysicalAddress::new(0x2000));
        assert_eq!(layout.total_frames(), 8);
        assert_eq!(layout.managed_frames(), 6);
    }

    #[test]
    fn aligned_kernel_end_is_kept() {
        let layout = PhysMemoryLayout::new(
            PhysicalAddress::new(FRAME_SIZE),
            PhysicalAddress::new(4 * FRAME_SIZE),
        )
        .unwrap();
        assert_eq!(layout.first_usable(), PhysicalAddress::new(FRAME_SIZE));
        assert_eq!(layout.managed_frames(), 3);
    }

    #[test]
    fn rejects_unaligned_top() {
        let err = PhysMemoryLayout::new(
            PhysicalAddress::zero(),
            PhysicalAddress::new(4 * FRAME_SIZE + 1),
        )
        .unwrap_err();
        assert_eq!(err, LayoutError::UnalignedTop);
    }

    #[test]
    fn rejects_empty_and_backwards_ranges() {
        // Kernel end rounds up past the top: nothing left to manage.
        let err = PhysMemoryLayout::new(
            PhysicalAddress::new(4 * FRAME_SIZE - 1),
            PhysicalAddress::new(4 * FRAME_SIZE),
        )
        .unwrap_err();
        assert_eq!(err, LayoutError::NoUsableFrames);

        let err = PhysMemoryLayout::new(
            PhysicalAddress::new(8 * FRAME_SIZE),
            PhysicalAddress::new(4 * FRAME_SIZE),
        )
        .unwrap_err();
        assert_eq!(err, LayoutError::NoUsableFrames);
    }

    #[test]
    fn managed_bounds() {
        let layout = PhysMemoryLayout::new(
            PhysicalAddress::new(2 * FRAME_SIZE),
            PhysicalAddress::new(6 * FRAME_SIZE),
        )
        .unwrap();
        assert!(!layout.is_managed(PhysicalAddress::new(2 * FRAME_SIZE - 1)));
        assert!(layout.is_managed(PhysicalAddress::new(2 * FRAME_SIZE)));
        assert!(layout.is_managed(PhysicalAddress::new(6 * FRAME_SIZE - 1)));
        assert!(!layout.is_managed(PhysicalAddress::new(6 * FRAME_SIZE)));
    }
}
