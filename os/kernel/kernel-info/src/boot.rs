//! # Kernel Boot Information

use crate::memory::{HIGHER_HALF_BASE, PAGE_SIZE, UPPER_MEMORY_BASE};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// Information the kernel needs from the bootloader.
/// Keep this `#[repr(C)]` and prefer fixed-size integers at the ABI boundary.
#[repr(C)]
#[derive(Clone)]
pub struct BootInfo {
    /// Contiguous memory below 1 MiB, in KiB.
    pub mem_lower_kib: u32,

    /// Memory above 1 MiB, in KiB.
    pub mem_upper_kib: u32,

    /// Memory map information.
    pub mmap: MemoryMapInfo,
}

impl BootInfo {
    /// Exclusive upper bound of physical memory the frame allocator should cover.
    #[must_use]
    pub const fn memory_limit(&self) -> u64 {
        UPPER_MEMORY_BASE as u64 + ((self.mem_upper_kib as u64) << 10)
    }
}

#[repr(C)]
#[derive(Clone)]
pub struct MemoryMapInfo {
    /// Physical address of an array of [`MemoryRegion`] records.
    pub mmap_ptr: u32,

    /// Length of the memory map buffer in **bytes**.
    pub mmap_len: u32,
}

impl MemoryMapInfo {
    /// Number of [`MemoryRegion`] records in the buffer.
    #[must_use]
    pub const fn region_count(&self) -> usize {
        self.mmap_len as usize / size_of::<MemoryRegion>()
    }
}

/// One entry of the physical memory map.
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MemoryRegion {
    /// Physical base address of the range.
    pub base: u64,
    /// Length of the range in bytes.
    pub length: u64,
    /// Type tag as reported by the firmware. Unknown values are treated as reserved.
    pub kind: u32,
}

impl MemoryRegion {
    /// Usable RAM.
    pub const AVAILABLE: u32 = 1;
    /// Reserved by firmware or hardware.
    pub const RESERVED: u32 = 2;

    #[must_use]
    pub const fn new(base: u64, length: u64, kind: u32) -> Self {
        Self { base, length, kind }
    }

    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.kind == Self::AVAILABLE
    }

    /// Exclusive end of the range, saturating at the top of the 64-bit space.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.base.saturating_add(self.length)
    }

    /// Whole frames fully inside the range, as `(first frame, count)`.
    ///
    /// The start is rounded up and the end rounded down, so partial frames at
    /// either edge are not included.
    #[must_use]
    pub const fn whole_frames(&self) -> (u64, u64) {
        let page = PAGE_SIZE as u64;
        let first = self.base.div_ceil(page);
        let end = self.end() / page;
        if end > first {
            (first, end - first)
        } else {
            (first, 0)
        }
    }

    /// Frames touched by the range, as `(first frame, count)`.
    ///
    /// The start is rounded down and the end rounded up.
    #[must_use]
    pub const fn covering_frames(&self) -> (u64, u64) {
        let page = PAGE_SIZE as u64;
        let first = self.base / page;
        let end = self.end().div_ceil(page);
        (first, end - first)
    }
}

/// Link-time extent of the kernel, as exported by the linker script.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KernelImage {
    /// First byte of the kernel image (higher-half address).
    pub start: VirtualAddress,
    /// One past the last byte of the kernel image (higher-half address).
    pub end: VirtualAddress,
    /// One past the last byte of the low-linked loader stub (physical).
    pub loader_end: PhysicalAddress,
}

impl KernelImage {
    /// Physical address the first kernel byte was loaded at.
    #[must_use]
    pub const fn physical_start(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.start.as_u32().wrapping_sub(HIGHER_HALF_BASE))
    }

    /// Physical address one past the last kernel byte.
    #[must_use]
    pub const fn physical_end(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.end.as_u32().wrapping_sub(HIGHER_HALF_BASE))
    }

    /// Number of 4 KiB pages covering `[start, end)`.
    #[must_use]
    pub const fn page_count(&self) -> u32 {
        self.end
            .as_u32()
            .saturating_sub(self.start.as_u32())
            .div_ceil(PAGE_SIZE)
    }
}
