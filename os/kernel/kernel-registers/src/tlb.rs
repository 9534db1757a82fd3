//! Translation lookaside buffer maintenance.

use kernel_memory_addresses::VirtualAddress;

/// Drop the cached translation for the page containing `va`.
///
/// Required after changing or removing a present mapping in the active
/// address space; adding a mapping where none existed needs no flush.
#[inline]
pub fn invlpg(va: VirtualAddress) {
    #[cfg(all(feature = "asm", target_arch = "x86"))]
    unsafe {
        core::arch::asm!("invlpg [{}]", in(reg) va.as_u32(), options(nostack, preserves_flags));
    }

    #[cfg(not(all(feature = "asm", target_arch = "x86")))]
    let _ = va;
}
