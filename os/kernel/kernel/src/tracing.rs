//! # Kernel Tracing helpers

use kernel_info::boot::{BootInfo, KernelImage, MemoryRegion};
use log::info;

const fn region_kind(region: &MemoryRegion) -> &'static str {
    match region.kind {
        MemoryRegion::AVAILABLE => "available",
        MemoryRegion::RESERVED => "reserved",
        _ => "other",
    }
}

pub fn trace_boot_info(boot_info: &BootInfo, regions: &[MemoryRegion], image: &KernelImage) {
    info!(
        concat!(
            "Boot Info in Kernel:\n",
            "  Memory   = lower {lower} KiB, upper {upper} KiB\n",
            "  MMAP ptr = {mmap_ptr:#010x}, len = {mmap_len}, regions = {count}\n",
            "  Kernel   = {start}..{end}, loader ends at {loader_end}"
        ),
        lower = boot_info.mem_lower_kib,
        upper = boot_info.mem_upper_kib,
        mmap_ptr = boot_info.mmap.mmap_ptr,
        mmap_len = boot_info.mmap.mmap_len,
        count = regions.len(),
        start = image.start,
        end = image.end,
        loader_end = image.loader_end,
    );

    for region in regions {
        info!(
            "  {:#012x}..{:#012x} {}",
            region.base,
            region.end(),
            region_kind(region)
        );
    }
}
