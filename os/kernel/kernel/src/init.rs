//! # Memory Manager Initialization
//!
//! Runs once paging is on and the kernel executes in the higher half.

use kernel_alloc::frame_alloc::BitmapFrameAlloc;
use kernel_alloc::vmm::{Vmm, VmmError};
use kernel_info::boot::{BootInfo, KernelImage, MemoryRegion};
use kernel_info::memory::{
    KERNEL_STACK_SIZE, KERNEL_STACK_START, PAGE_SIZE, VGA_BUFFER_PADDR, VGA_BUFFER_SIZE,
    VGA_BUFFER_VADDR,
};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};
use kernel_vmem::{PageEntryBits, TableAccess};
use log::{debug, info};

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum InitError {
    #[error("virtual memory: {0}")]
    Vmm(#[from] VmmError),
    #[error("the frame allocator was already handed out")]
    FramesTaken,
}

/// Seed `frames` from the firmware memory map.
///
/// Every frame starts out occupied. Available regions are released, rounded
/// inward to whole frames. Everything below the end of the kernel image and
/// the VGA buffer are then reserved again. Returns the number of free frames.
pub fn setup_physical_memory<const N: usize>(
    frames: &mut BitmapFrameAlloc<N>,
    boot: &BootInfo,
    regions: &[MemoryRegion],
    image: &KernelImage,
) -> u32 {
    frames.init(boot.memory_limit());

    for region in regions.iter().filter(|r| r.is_available()) {
        let (first, count) = region.whole_frames();
        let Ok(first) = u32::try_from(first) else {
            // Above 4 GiB; never manageable.
            continue;
        };
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        debug!(
            "Usable memory {:#x}..{:#x}: {count} frames",
            region.base,
            region.end()
        );
        frames.mark_range_free(first, count);
    }

    let kernel_end = image.physical_end().as_u32().div_ceil(PAGE_SIZE);
    frames.mark_range_occupied(0, kernel_end);
    frames.mark_range_occupied(
        VGA_BUFFER_PADDR / PAGE_SIZE,
        VGA_BUFFER_SIZE.div_ceil(PAGE_SIZE),
    );

    let free = frames.free_frames();
    info!(
        "Frame allocator manages {} MiB, {free} frames free",
        frames.manageable_size() >> 20
    );
    free
}

/// Bring up physical and virtual memory management.
///
/// Seeds `frames` (see [`setup_physical_memory`]), then maps the VGA text
/// buffer and backs the kernel stack through `tables`.
///
/// # Errors
/// [`InitError::Vmm`] if a mapping cannot be made.
pub fn init_memory<'a, T: TableAccess, const N: usize>(
    frames: &'a mut BitmapFrameAlloc<N>,
    tables: T,
    boot: &BootInfo,
    regions: &[MemoryRegion],
    image: &KernelImage,
) -> Result<Vmm<'a, T, BitmapFrameAlloc<N>>, InitError> {
    setup_physical_memory(frames, boot, regions, image);
    let mut vmm = Vmm::new(tables, frames);

    for offset in (0..VGA_BUFFER_SIZE).step_by(PAGE_SIZE as usize) {
        vmm.set_mapping(
            VirtualAddress::new(VGA_BUFFER_VADDR + offset),
            PhysicalAddress::new(VGA_BUFFER_PADDR + offset),
            PageEntryBits::new_kernel_rw(),
        )?;
    }
    info!("VGA text buffer mapped at {:#010x}", VGA_BUFFER_VADDR);

    vmm.alloc_pages(
        VirtualAddress::new(KERNEL_STACK_START),
        KERNEL_STACK_SIZE,
        PageEntryBits::new_kernel_rw(),
    )?;
    info!(
        "Kernel stack backed at {:#010x}..{:#010x}",
        KERNEL_STACK_START,
        KERNEL_STACK_START + (KERNEL_STACK_SIZE - 1)
    );

    Ok(vmm)
}
