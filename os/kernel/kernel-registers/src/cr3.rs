#[cfg(all(feature = "asm", target_arch = "x86"))]
use crate::{LoadRegisterUnsafe, StoreRegisterUnsafe};
use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// CR3 without PAE: the page directory frame plus its cache policy.
#[bitfield(u32)]
pub struct Cr3 {
    #[bits(3)]
    _ignored_low: u8,
    /// Write-through for directory reads.
    pub pwt: bool,
    /// Uncached directory reads.
    pub pcd: bool,
    #[bits(7)]
    _ignored_high: u8,
    #[bits(20)]
    directory_frame: u32,
}

impl Cr3 {
    /// CR3 value activating the directory at `directory_phys`, which must
    /// be page aligned.
    #[must_use]
    pub fn from_directory_phys(directory_phys: PhysicalAddress, pwt: bool, pcd: bool) -> Self {
        debug_assert!(
            directory_phys.is_aligned::<Size4K>(),
            "unaligned page directory"
        );
        Self::new()
            .with_pwt(pwt)
            .with_pcd(pcd)
            .with_directory_frame(directory_phys.page::<Size4K>().frame_number())
    }

    #[must_use]
    pub const fn directory_phys(&self) -> PhysicalAddress {
        PhysicalPage::<Size4K>::from_frame_number(self.directory_frame()).base()
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl LoadRegisterUnsafe for Cr3 {
    unsafe fn load_unsafe() -> Self {
        let mut cr3: u32;
        unsafe {
            core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        }
        Self::from_bits(cr3)
    }
}

#[cfg(all(feature = "asm", target_arch = "x86"))]
impl StoreRegisterUnsafe for Cr3 {
    unsafe fn store_unsafe(self) {
        let cr3 = self.into_bits();
        unsafe {
            core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
        }
    }
}
