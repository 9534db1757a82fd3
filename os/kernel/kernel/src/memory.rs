//! # Post-Init Mapping Housekeeping

use kernel_alloc::vmm::{Vmm, VmmError};
use kernel_info::boot::{KernelImage, MemoryRegion};
use kernel_info::memory::{IDENTITY_LOW_BYTES, PAGE_SIZE};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_vmem::{FrameAlloc, PageEntryBits, TableAccess};
use log::{debug, info, warn};

/// Frames below 4 GiB.
const FRAME_LIMIT: u64 = 1 << 20;

/// Frames of the reserved regions that lie below 4 GiB.
fn reserved_frames(regions: &[MemoryRegion]) -> impl Iterator<Item = u32> + '_ {
    regions
        .iter()
        .filter(|r| !r.is_available())
        .flat_map(|r| {
            let (first, count) = r.covering_frames();
            first.min(FRAME_LIMIT)..first.saturating_add(count).min(FRAME_LIMIT)
        })
        .filter_map(|frame| u32::try_from(frame).ok())
}

/// Identity-map every reserved region read-only so firmware tables can be read.
///
/// Pages in the self-map window, and pages already mapped elsewhere, are
/// skipped. Returns the number of pages newly mapped or already in place.
///
/// # Errors
/// [`VmmError::OutOfPhysicalMemory`] if a page table cannot be allocated.
pub fn lock_reserved_memory<T: TableAccess, A: FrameAlloc>(
    vmm: &mut Vmm<'_, T, A>,
    regions: &[MemoryRegion],
) -> Result<u32, VmmError> {
    let mut mapped = 0;
    for frame in reserved_frames(regions) {
        let addr = frame << 12;
        match vmm.set_mapping(
            VirtualAddress::new(addr),
            PhysicalAddress::new(addr),
            PageEntryBits::new_kernel_ro(),
        ) {
            Ok(()) => mapped += 1,
            Err(e @ (VmmError::ProtectedRegion | VmmError::MappingConflict)) => {
                warn!("Reserved page {addr:#010x} not identity mapped: {e}");
            }
            Err(e) => return Err(e),
        }
    }
    info!("Identity mapped {mapped} reserved pages");
    Ok(mapped)
}

/// Undo [`lock_reserved_memory`]. Frames stay reserved.
///
/// Only pages that still identity-map their frame are removed.
///
/// # Errors
/// Propagated from [`Vmm::unmap_device_page`].
pub fn unlock_reserved_memory<T: TableAccess, A: FrameAlloc>(
    vmm: &mut Vmm<'_, T, A>,
    regions: &[MemoryRegion],
) -> Result<u32, VmmError> {
    let mut unmapped = 0;
    for frame in reserved_frames(regions) {
        let va = VirtualAddress::new(frame << 12);
        let mapping = vmm.lookup(va);
        if !mapping.is_present() || mapping.frame != frame {
            continue;
        }
        vmm.unmap_device_page(va)?;
        unmapped += 1;
    }
    debug!("Removed {unmapped} reserved identity pages");
    Ok(unmapped)
}

/// Drop the identity mapping of the loader stub, `[1 MiB, loader_end)`.
///
/// The first MiB stays mapped. The frames stay reserved: the bootstrap
/// directory and tables live in the loader image and remain in use.
///
/// # Errors
/// Propagated from [`Vmm::unmap_device_page`].
pub fn release_loader_identity<T: TableAccess, A: FrameAlloc>(
    vmm: &mut Vmm<'_, T, A>,
    image: &KernelImage,
) -> Result<u32, VmmError> {
    let end = image.loader_end.as_u32().div_ceil(PAGE_SIZE) * PAGE_SIZE;
    let mut released = 0;
    for addr in (IDENTITY_LOW_BYTES..end).step_by(PAGE_SIZE as usize) {
        let va = VirtualAddress::new(addr);
        if !vmm.lookup(va).is_present() {
            continue;
        }
        vmm.unmap_device_page(va)?;
        released += 1;
    }
    info!("Dropped {released} loader identity pages");
    Ok(released)
}
