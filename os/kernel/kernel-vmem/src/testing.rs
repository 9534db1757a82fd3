//! Host-side stand-ins for physical memory and frame allocation.
//!
//! Only compiled for tests and for dependents enabling the `testing` feature.

use crate::{FrameAlloc, PhysMapper};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use std::alloc::{Layout, alloc_zeroed, dealloc, handle_alloc_error};
use std::ptr::NonNull;

/// Simulated physical RAM: a zeroed, 4 KiB-aligned heap region where
/// physical address `pa` is byte `pa` of the region.
pub struct SimRam {
    base: NonNull<u8>,
    layout: Layout,
}

impl SimRam {
    /// RAM covering frames `0..frames`.
    ///
    /// # Panics
    /// If the layout is invalid for the host allocator.
    #[must_use]
    pub fn new(frames: u32) -> Self {
        let size = frames as usize * 4096;
        let layout = Layout::from_size_align(size.max(4096), 4096).expect("valid layout");
        let raw = unsafe { alloc_zeroed(layout) };
        let Some(base) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };
        Self { base, layout }
    }

    /// Size of the simulated RAM in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.layout.size()
    }

    /// Raw pointer to the byte at `pa`.
    ///
    /// # Panics
    /// If `pa` lies outside the simulated RAM.
    #[must_use]
    pub fn frame_ptr(&self, pa: PhysicalAddress) -> *mut u8 {
        assert!(pa.as_usize() < self.size(), "{pa:?} outside simulated RAM");
        unsafe { self.base.as_ptr().add(pa.as_usize()) }
    }

    /// Read the 32-bit word at `pa`.
    #[must_use]
    pub fn read_u32(&self, pa: PhysicalAddress) -> u32 {
        unsafe { self.frame_ptr(pa).cast::<u32>().read() }
    }

    /// Fill the frame `frame` with `byte`.
    pub fn fill_frame(&self, frame: PhysicalPage<Size4K>, byte: u8) {
        unsafe { self.frame_ptr(frame.base()).write_bytes(byte, 4096) }
    }
}

impl PhysMapper for SimRam {
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T {
        assert!(pa.as_usize() + size_of::<T>() <= self.size());
        unsafe { &mut *self.frame_ptr(pa).cast::<T>() }
    }
}

impl Drop for SimRam {
    fn drop(&mut self) {
        unsafe { dealloc(self.base.as_ptr(), self.layout) }
    }
}

/// A trivial **bump** allocator: hands out frames `next..end` in order and
/// records every frame returned to it.
pub struct BumpAlloc {
    next: u32,
    end: u32,
    /// Frames passed to [`FrameAlloc::free_4k`], in call order.
    pub freed: Vec<PhysicalPage<Size4K>>,
}

impl BumpAlloc {
    /// Hand out frame numbers `first..end`.
    #[must_use]
    pub const fn new(first: u32, end: u32) -> Self {
        Self {
            next: first,
            end,
            freed: Vec::new(),
        }
    }

    /// Frames still available.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.end.saturating_sub(self.next)
    }
}

impl FrameAlloc for BumpAlloc {
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        if self.next >= self.end {
            return None;
        }
        let frame = PhysicalPage::from_frame_number(self.next);
        self.next += 1;
        Some(frame)
    }

    fn free_4k(&mut self, frame: PhysicalPage<Size4K>) {
        self.freed.push(frame);
    }
}
