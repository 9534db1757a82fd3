//! Virtual Memory Manager (VMM) for the kernel.
//!
//! Page-granular map, unmap and lookup operations on one address space. Tables
//! are reached through a [`TableAccess`] view (the self-map in the running
//! kernel) and frames come from a [`FrameAlloc`] (the bitmap allocator).
//!
//! # Example
//! ```ignore
//! use kernel_alloc::{frame_alloc::BitmapFrameAlloc, vmm::Vmm};
//! use kernel_vmem::{PageEntryBits, self_map::RecursiveWindow};
//!
//! let mut vmm = Vmm::new(unsafe { RecursiveWindow::new() }, &mut pmm);
//! let va = vmm.alloc_page(VirtualAddress::new(0xD000_0000), PageEntryBits::new_kernel_rw())?;
//! ```
//!
//! # Ownership
//!
//! Frames mapped by [`Vmm::alloc_page`], [`Vmm::alloc_pages`] and
//! [`Vmm::map_page`] are released back to the allocator by
//! [`Vmm::unmap_page`] or when [`Vmm::fmap_page`] displaces them. Device
//! memory is removed with [`Vmm::unmap_device_page`], which never frees.
//!
//! A page owns the frame stored in its entry whether or not the present bit
//! is set, so a mapping made without `PRESENT` is released like any other.
//!
//! The 4 MiB covered by the self-map slot, the scratch page and the stack
//! guard page are off limits. Every mutating call refuses them with
//! [`VmmError::ProtectedRegion`] and probing never lands on them.

use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress, VirtualPage};
use kernel_vmem::info::{PAGE_SIZE, SELF_MAP_INDEX};
use kernel_vmem::self_map::is_reserved;
use kernel_vmem::{
    AddressSpace, AddressSpaceError, DirectoryIndex, FrameAlloc, PageEntryBits, PdEntry, PtEntry,
    TableAccess,
};
use log::{debug, trace, warn};

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum VmmError {
    #[error("out of physical memory")]
    OutOfPhysicalMemory,
    #[error("null or misaligned address")]
    InvalidAddress,
    #[error("the page is already mapped to a different frame")]
    MappingConflict,
    #[error("the address lies in the self-map window or a reserved kernel page")]
    ProtectedRegion,
    #[error("no free page left below the self-map window")]
    AddressSpaceExhausted,
    #[error("the frame or table cannot be reached through the current view")]
    FrameWindowUnavailable,
}

impl From<AddressSpaceError> for VmmError {
    fn from(e: AddressSpaceError) -> Self {
        match e {
            AddressSpaceError::OutOfMemory => Self::OutOfPhysicalMemory,
            AddressSpaceError::Occupied => Self::MappingConflict,
            AddressSpaceError::TableUnreachable(_) => Self::FrameWindowUnavailable,
        }
    }
}

/// Result of [`Vmm::lookup`]. All zero for an unused slot.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Mapping {
    /// Frame number, i.e. `physical >> 12`.
    pub frame: u32,
    pub physical: PhysicalAddress,
    /// The defined flag bits of the entry.
    pub flags: PageEntryBits,
}

impl Mapping {
    #[inline]
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.flags.present()
    }
}

/// Kernel virtual memory manager.
pub struct Vmm<'a, T: TableAccess, A: FrameAlloc> {
    space: AddressSpace<T>,
    frames: &'a mut A,
}

impl<'a, T: TableAccess, A: FrameAlloc> Vmm<'a, T, A> {
    pub const fn new(tables: T, frames: &'a mut A) -> Self {
        Self {
            space: AddressSpace::new(tables),
            frames,
        }
    }

    /// The frame allocator backing this VMM.
    #[inline]
    pub const fn frames(&mut self) -> &mut A {
        &mut *self.frames
    }

    /// The table view this VMM works through.
    #[inline]
    pub const fn tables(&mut self) -> &mut T {
        self.space.tables_mut()
    }

    #[inline]
    pub fn into_parts(self) -> (T, &'a mut A) {
        (self.space.into_inner(), self.frames)
    }

    /// Allocate and prepare a fresh page directory.
    ///
    /// The directory is zeroed except for slot 1023, which refers back to the
    /// directory itself. The frame is returned for loading into CR3.
    ///
    /// # Errors
    /// - [`VmmError::OutOfPhysicalMemory`] if no frame is free.
    /// - [`VmmError::FrameWindowUnavailable`] if the frame cannot be viewed;
    ///   it is released again.
    pub fn init_directory(&mut self) -> Result<PhysicalPage<Size4K>, VmmError> {
        let frame = self
            .frames
            .alloc_4k()
            .ok_or(VmmError::OutOfPhysicalMemory)?;

        let prepared = self.space.tables_mut().with_frame(frame, |directory| {
            directory.zero();
            directory.set(
                DirectoryIndex::new(SELF_MAP_INDEX),
                PdEntry::make_table(frame, PageEntryBits::new_self_map()),
            );
        });

        if prepared.is_none() {
            self.frames.free_4k(frame);
            return Err(VmmError::FrameWindowUnavailable);
        }

        debug!("Prepared page directory at {frame:?}");
        Ok(frame)
    }

    /// Map the frame at `pa` at `va`, or at the next free page after it.
    ///
    /// Occupied slots are skipped and tables are created on the way. Returns
    /// the virtual address actually used.
    ///
    /// # Errors
    /// - [`VmmError::InvalidAddress`] for null or misaligned addresses.
    /// - [`VmmError::ProtectedRegion`] if `va` is reserved.
    /// - [`VmmError::AddressSpaceExhausted`] if no free page is left before it.
    /// - [`VmmError::OutOfPhysicalMemory`] if a table cannot be allocated.
    pub fn map_page(
        &mut self,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: PageEntryBits,
    ) -> Result<VirtualAddress, VmmError> {
        let (page, frame) = Self::pages(va, pa, true)?;
        Self::guard("map_page", va)?;

        let slot = self
            .space
            .find_free_slot(page)
            .ok_or(VmmError::AddressSpaceExhausted)?;
        self.space.install(self.frames, slot, frame, flags, false)?;

        trace!("Mapped {slot:?} -> {frame:?}");
        Ok(slot.base())
    }

    /// Map the frame at `pa` at exactly `va`, replacing any previous mapping.
    ///
    /// The frame of a displaced entry is released to the allocator unless it
    /// is the frame being mapped.
    ///
    /// # Errors
    /// - [`VmmError::InvalidAddress`] for null or misaligned addresses.
    /// - [`VmmError::ProtectedRegion`] if `va` is reserved.
    /// - [`VmmError::OutOfPhysicalMemory`] if a table cannot be allocated.
    pub fn fmap_page(
        &mut self,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: PageEntryBits,
    ) -> Result<VirtualAddress, VmmError> {
        let (page, frame) = Self::pages(va, pa, true)?;
        Self::guard("fmap_page", va)?;

        let displaced = self.space.install(self.frames, page, frame, flags, true)?;
        if let Some(old) = displaced.filter(|&old| old != frame) {
            trace!("Remapping {page:?} released {old:?}");
            self.frames.free_4k(old);
        }
        Ok(page.base())
    }

    /// Map `va` to `pa` exactly, without touching an existing mapping.
    ///
    /// Used for identity and device mappings; address 0 is allowed. Mapping a
    /// page again to the frame it already maps succeeds without change.
    ///
    /// # Errors
    /// - [`VmmError::InvalidAddress`] for misaligned addresses.
    /// - [`VmmError::ProtectedRegion`] if `va` is reserved.
    /// - [`VmmError::MappingConflict`] if `va` maps a different frame.
    /// - [`VmmError::OutOfPhysicalMemory`] if a table cannot be allocated.
    pub fn set_mapping(
        &mut self,
        va: VirtualAddress,
        pa: PhysicalAddress,
        flags: PageEntryBits,
    ) -> Result<(), VmmError> {
        let (page, frame) = Self::pages(va, pa, false)?;
        Self::guard("set_mapping", va)?;

        match self.space.install(self.frames, page, frame, flags, false) {
            Ok(_) => Ok(()),
            Err(AddressSpaceError::Occupied) => {
                let existing = self.space.entry(page).and_then(PtEntry::stored_frame);
                if existing == Some(frame) {
                    Ok(())
                } else {
                    Err(VmmError::MappingConflict)
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the mapping at `va` and release its frame.
    ///
    /// An unmapped page is not an error.
    ///
    /// # Errors
    /// - [`VmmError::InvalidAddress`] if `va` is misaligned.
    /// - [`VmmError::ProtectedRegion`] if `va` is reserved.
    pub fn unmap_page(&mut self, va: VirtualAddress) -> Result<(), VmmError> {
        let page = Self::page(va)?;
        Self::guard("unmap_page", va)?;
        self.release(page);
        Ok(())
    }

    /// Remove the mapping at `va` but keep the frame allocated.
    ///
    /// For device memory and anything else the allocator does not own.
    ///
    /// # Errors
    /// - [`VmmError::InvalidAddress`] if `va` is misaligned.
    /// - [`VmmError::ProtectedRegion`] if `va` is reserved.
    pub fn unmap_device_page(&mut self, va: VirtualAddress) -> Result<(), VmmError> {
        let page = Self::page(va)?;
        Self::guard("unmap_device_page", va)?;
        self.space.clear(page);
        Ok(())
    }

    /// Allocate a frame and map it at `va` or the next free page after it.
    ///
    /// # Errors
    /// As [`map_page`](Self::map_page); the frame is released on failure.
    pub fn alloc_page(
        &mut self,
        va: VirtualAddress,
        flags: PageEntryBits,
    ) -> Result<VirtualAddress, VmmError> {
        let frame = self
            .frames
            .alloc_4k()
            .ok_or(VmmError::OutOfPhysicalMemory)?;

        match self.map_page(va, frame.base(), flags) {
            Ok(used) => Ok(used),
            Err(e) => {
                self.frames.free_4k(frame);
                Err(e)
            }
        }
    }

    /// Back `size` bytes starting at `va` with fresh frames, exactly in place.
    ///
    /// All or nothing: on failure every page mapped by this call is unmapped
    /// and its frame released, including the frame of the failing page.
    ///
    /// # Errors
    /// - [`VmmError::InvalidAddress`] if `va` or `size` is not page aligned, or
    ///   the range wraps around the address space.
    /// - [`VmmError::MappingConflict`] if a page of the range is in use.
    /// - [`VmmError::ProtectedRegion`] if the range touches a reserved page.
    /// - [`VmmError::OutOfPhysicalMemory`] if frames or tables run out.
    pub fn alloc_pages(
        &mut self,
        va: VirtualAddress,
        size: u32,
        flags: PageEntryBits,
    ) -> Result<(), VmmError> {
        let first = Self::page(va)?;
        if !size.is_multiple_of(PAGE_SIZE) || u64::from(va.as_u32()) + u64::from(size) > 1 << 32 {
            return Err(VmmError::InvalidAddress);
        }

        let pages = size / PAGE_SIZE;
        for i in 0..pages {
            let page = VirtualPage::from_page_number(first.page_number() + i);
            if let Err(e) = self.back_page(page, flags) {
                debug!("Backing {pages} pages at {va:?} failed at page {i}: {e}");
                for done in 0..i {
                    self.release(VirtualPage::from_page_number(first.page_number() + done));
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Read the mapping of the page containing `va`.
    pub fn lookup(&mut self, va: VirtualAddress) -> Mapping {
        let page = VirtualPage::containing_address(va);
        match self.space.entry(page) {
            Some(entry) if !entry.is_free() => Mapping {
                frame: entry.frame().frame_number(),
                physical: entry.frame().base(),
                flags: entry.flags().defined_flags(),
            },
            _ => Mapping::default(),
        }
    }

    /// Translate `va` through a present mapping, keeping the page offset.
    pub fn virtual_to_physical(&mut self, va: VirtualAddress) -> Option<PhysicalAddress> {
        let page = VirtualPage::containing_address(va);
        let (frame, _) = self.space.entry(page).and_then(PtEntry::page_4k)?;
        Some(frame.join(va.offset()))
    }

    fn back_page(&mut self, page: VirtualPage<Size4K>, flags: PageEntryBits) -> Result<(), VmmError> {
        Self::guard("alloc_pages", page.base())?;
        let frame = self
            .frames
            .alloc_4k()
            .ok_or(VmmError::OutOfPhysicalMemory)?;

        if let Err(e) = self.space.install(self.frames, page, frame, flags, false) {
            self.frames.free_4k(frame);
            return Err(e.into());
        }
        Ok(())
    }

    /// Clear `page` and release the frame it held, present or not.
    fn release(&mut self, page: VirtualPage<Size4K>) {
        if let Some(frame) = self.space.clear(page).and_then(PtEntry::stored_frame) {
            self.frames.free_4k(frame);
        }
    }

    fn guard(op: &str, va: VirtualAddress) -> Result<(), VmmError> {
        if is_reserved(va) {
            warn!("{op}: {va:?} is reserved for the memory manager, request ignored");
            return Err(VmmError::ProtectedRegion);
        }
        Ok(())
    }

    fn page(va: VirtualAddress) -> Result<VirtualPage<Size4K>, VmmError> {
        if !va.is_aligned::<Size4K>() {
            return Err(VmmError::InvalidAddress);
        }
        Ok(VirtualPage::containing_address(va))
    }

    fn pages(
        va: VirtualAddress,
        pa: PhysicalAddress,
        reject_null: bool,
    ) -> Result<(VirtualPage<Size4K>, PhysicalPage<Size4K>), VmmError> {
        if reject_null && (va.is_null() || pa.is_null()) {
            return Err(VmmError::InvalidAddress);
        }
        if !pa.is_aligned::<Size4K>() {
            return Err(VmmError::InvalidAddress);
        }
        Ok((Self::page(va)?, pa.page()))
    }
}
