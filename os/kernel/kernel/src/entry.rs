//! Bare-metal entry after the paging switch.

use crate::halt::halt;
use crate::init::{InitError, init_memory};
use crate::memory::{lock_reserved_memory, release_loader_identity};
use crate::tracing::trace_boot_info;
use kernel_alloc::frame_alloc::BitmapFrameAlloc;
use kernel_info::boot::{BootInfo, KernelImage, MemoryRegion};
use kernel_qemu::QemuLogger;
use kernel_sync::BootCell;
use kernel_vmem::self_map::RecursiveWindow;
use log::{LevelFilter, error, info};

static LOGGER: QemuLogger = QemuLogger::new(LevelFilter::Debug);

/// The frame bitmap lives in `.bss`; [`BootCell`] hands it out once.
static FRAMES: BootCell<BitmapFrameAlloc> = BootCell::new(BitmapFrameAlloc::new());

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    error!("{info}");
    halt()
}

/// Higher-half kernel entry, jumped to by the loader stub once paging is on.
///
/// # Safety
/// `boot_info` and `image` must be valid and reachable through the current
/// mappings, as must the memory map `boot_info` points to.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn kernel_main(boot_info: *const BootInfo, image: *const KernelImage) -> ! {
    if let Err(e) = LOGGER.init() {
        kernel_qemu::qemu_trace!("logger not installed: {e}\n");
    }

    let (boot, image) = unsafe { (&*boot_info, &*image) };
    let regions = unsafe {
        core::slice::from_raw_parts(
            boot.mmap.mmap_ptr as usize as *const MemoryRegion,
            boot.mmap.region_count(),
        )
    };
    trace_boot_info(boot, regions, image);

    match bring_up_memory(boot, regions, image) {
        Ok(()) => info!("Memory management is up"),
        Err(e) => error!("Memory bring-up failed: {e}"),
    }
    halt()
}

fn bring_up_memory(
    boot: &BootInfo,
    regions: &[MemoryRegion],
    image: &KernelImage,
) -> Result<(), InitError> {
    let frames = FRAMES.take().ok_or(InitError::FramesTaken)?;
    let tables = unsafe { RecursiveWindow::new() };

    let mut vmm = init_memory(frames, tables, boot, regions, image)?;
    lock_reserved_memory(&mut vmm, regions)?;
    release_loader_identity(&mut vmm, image)?;
    Ok(())
}
