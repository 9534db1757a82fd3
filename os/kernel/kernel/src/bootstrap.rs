//! # Paging Switch
//!
//! Runs in the low-linked loader stub with translation still off. The page
//! block and the kernel image extent are passed in by physical address.

use kernel_info::boot::KernelImage;
use kernel_memory_addresses::PhysicalAddress;
use kernel_registers::cr0::Cr0;
use kernel_registers::cr3::Cr3;
use kernel_vmem::bootstrap::{self, BootstrapError, BootstrapPageBlock};

/// The register values that turn on paging with a freshly built directory.
#[derive(Debug, Copy, Clone)]
pub struct PagingSwitch {
    pub cr3: Cr3,
    pub cr0: Cr0,
}

/// Build the bootstrap directory in `block` and compute the register values
/// that activate it, starting from the current `cr0`.
///
/// # Errors
/// Any [`BootstrapError`] of the page builder. Nothing is activated then.
pub fn prepare_paging(
    block: &mut BootstrapPageBlock,
    block_phys: PhysicalAddress,
    image: &KernelImage,
    cr0: Cr0,
) -> Result<PagingSwitch, BootstrapError> {
    let directory = bootstrap::build(block, block_phys, image)?;
    Ok(PagingSwitch {
        cr3: Cr3::from_directory_phys(directory.base(), false, false),
        cr0: cr0.with_pg_paging(true),
    })
}

/// Build the bootstrap directory, load CR3 and set CR0.PG.
///
/// Halts if the image does not fit the bootstrap tables.
///
/// # Safety
/// Must run with paging disabled, from code that stays identity mapped by the
/// builder. `block_phys` must be the physical address of `block`.
#[cfg(target_arch = "x86")]
pub unsafe fn bootstrap_paging(
    block: &mut BootstrapPageBlock,
    block_phys: PhysicalAddress,
    image: &KernelImage,
) {
    use kernel_registers::{LoadRegisterUnsafe, StoreRegisterUnsafe};

    let current = unsafe { Cr0::load_unsafe() };
    let Ok(switch) = prepare_paging(block, block_phys, image, current) else {
        // No logging yet; the sink lives in the not yet mapped higher half.
        crate::halt::halt();
    };

    unsafe {
        switch.cr3.store_unsafe();
        switch.cr0.store_unsafe();
    }
}
