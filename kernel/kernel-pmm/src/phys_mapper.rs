//! Physical-memory access seam.
//!
//! The allocator tracks frames by physical address but occasionally has to
//! touch their *contents* (poison fills on allocate and free). Rust code can
//! only dereference virtual addresses, and how a physical address becomes a
//! usable pointer differs between the kernel (higher-half direct map), the
//! bootloader (identity map), and hosted tests (a synthetic arena). This
//! trait abstracts over exactly that translation.

use kernel_memory_addresses::PhysicalAddress;

/// Translate a physical address into a pointer usable in the current
/// address space.
pub trait PhysMapper {
    /// Pointer to the byte at physical address `pa`.
    ///
    /// # Safety
    /// - The translation scheme must actually map `pa` in the current
    ///   address space.
    /// - The caller must only access memory it exclusively owns, for at most
    ///   the length that is mapped and writable.
    unsafe fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8;
}

/// [`PhysMapper`] for kernels with a higher-half direct map (HHDM): every
/// physical address is visible at `hhdm_base + pa`.
///
/// The base is injected at construction; the boot layer knows where it put
/// the direct map.
pub struct HhdmPhysMapper {
    hhdm_base: u64,
}

impl HhdmPhysMapper {
    #[must_use]
    pub const fn new(hhdm_base: u64) -> Self {
        Self { hhdm_base }
    }
}

impl PhysMapper for HhdmPhysMapper {
    unsafe fn phys_to_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        // Safety contract is inherited from the trait: the HHDM must be
        // present and cover `pa`.
        (self.hhdm_base as usize + pa.as_usize()) as *mut u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhdm_translation_is_a_fixed_offset() {
        // A buffer's own address works as a stand-in direct-map base, making
        // "physical" addresses plain offsets into it.
        let mut buf = [0_u8; 16];
        let mapper = HhdmPhysMapper::new(buf.as_mut_ptr() as u64);

        unsafe {
            *mapper.phys_to_ptr(PhysicalAddress::new(3)) = 0x42;
        }
        assert_eq!(buf[3], 0x42);
    }
}
