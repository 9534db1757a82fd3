#[cfg(all(feature = "asm", target_arch = "x86"))]
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;

/// CR0 as seen by 32-bit protected mode code.
///
/// Only the bits this kernel touches are documented. Reserved ranges
/// default to zero.
#[bitfield(u32)]
pub struct Cr0 {
    /// PE. Set by the loader before we run.
    pub pe_protection_enable: bool,
    /// MP
    pub mp_monitor_coprocessor: bool,
    /// EM
    pub em_emulation: bool,
    /// TS
    pub ts_task_switched: bool,
    /// ET
    pub et_extension_type: bool,
    /// NE
    pub ne_numeric_error: bool,
    #[bits(10, default = 0)]
    _reserved_low: u16,
    /// WP. Ring 0 writes fault on read-only pages when set.
    pub wp_write_protect: bool,
    #[bits(1, default = 0)]
    _reserved_17: u8,
    /// AM
    pub am_alignment_mask: bool,
    #[bits(10, default = 0)]
    _reserved_high: u16,
    /// NW
    pub nw_not_write_through: bool,
    /// CD
    pub cd_cache_disable: bool,
    /// PG. Translation through CR3 is active once this is written with PE set.
    pub pg_paging: bool,
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl LoadRegisterUnsafe for Cr0 {
    unsafe fn load_unsafe() -> Self {
        let mut cr0: u32;
        unsafe {
            core::arch::asm!("mov {}, cr0", out(reg) cr0, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr0)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl StoreRegisterUnsafe for Cr0 {
    unsafe fn store_unsafe(self) {
        let cr0 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr0, {}", in(reg) cr0, options(nostack, preserves_flags));
        }
    }
}
