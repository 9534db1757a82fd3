//! # Address Space (32-bit, directory-rooted)
//!
//! Primitives to build and manipulate a **single** virtual address space
//! through a [`TableAccess`] view:
//!
//! - [`AddressSpace::ensure_table`] allocates, links and zeroes a missing table.
//! - [`AddressSpace::install`] writes one exact 4 KiB mapping, optionally
//!   replacing whatever was there, and reports the displaced frame.
//! - [`AddressSpace::clear`] removes one mapping.
//! - [`AddressSpace::entry`] reads one mapping.
//! - [`AddressSpace::find_free_slot`] probes forward for an unused page.
//!
//! ## Design
//!
//! - Directory entries are created `PRESENT | WRITABLE`, plus `USER` when the
//!   leaf needs it. Leaf flags come from the caller, masked to the defined bits.
//! - Frames are never freed here; ownership decisions belong to the caller,
//!   which receives displaced frames back.
//! - Tables are never released once created.
//!
//! ## Safety
//!
//! Changes to live mappings are followed by [`TableAccess::invalidate`].

use crate::info::SELF_MAP_INDEX;
use crate::page_table::{
    DirectoryIndex, PageTable, PdEntry, PtEntry, TableIndex, join_indices, split_indices,
};
use crate::self_map::{is_reserved, table_window};
use crate::table_access::TableAccess;
use crate::{FrameAlloc, PageEntryBits};
use kernel_memory_addresses::{PhysicalPage, Size4K, VirtualPage};
use log::trace;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum AddressSpaceError {
    #[error("out of physical memory while allocating a page table")]
    OutOfMemory,
    #[error("the page is already mapped")]
    Occupied,
    #[error("the table of directory slot {0} cannot be reached")]
    TableUnreachable(u16),
}

/// Handle to a single, concrete address space.
pub struct AddressSpace<T: TableAccess> {
    tables: T,
}

impl<T: TableAccess> AddressSpace<T> {
    #[inline]
    pub const fn new(tables: T) -> Self {
        Self { tables }
    }

    #[inline]
    pub const fn tables(&self) -> &T {
        &self.tables
    }

    #[inline]
    pub const fn tables_mut(&mut self) -> &mut T {
        &mut self.tables
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.tables
    }

    /// Read the directory entry at `index`.
    #[inline]
    pub fn directory_entry(&mut self, index: DirectoryIndex) -> PdEntry {
        self.tables.directory().get(index)
    }

    /// Read the table entry for `page`, or `None` if its table does not exist.
    pub fn entry(&mut self, page: VirtualPage<Size4K>) -> Option<PtEntry> {
        let (di, ti) = split_indices(page.base());
        self.tables.table(di).map(|table| table.get(ti))
    }

    /// Make sure directory slot `index` links a table and return it.
    ///
    /// A missing table is allocated from `alloc`, linked, its window
    /// invalidated and then zero-filled before it is returned. When `user` is
    /// set an existing supervisor-only link is upgraded to allow user access.
    ///
    /// # Errors
    /// - [`AddressSpaceError::OutOfMemory`] if no frame is available.
    /// - [`AddressSpaceError::TableUnreachable`] if the view cannot reach the table.
    pub fn ensure_table<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        index: DirectoryIndex,
        user: bool,
    ) -> Result<&mut PageTable, AddressSpaceError> {
        debug_assert_ne!(index.as_u16(), SELF_MAP_INDEX, "self-map slot is not a table");

        let directory = self.tables.directory();
        let entry = directory.get(index);
        let created = if let Some(frame) = entry.next_table() {
            if user && !entry.flags().user_access() {
                directory.set(
                    index,
                    PdEntry::make_table(frame, entry.flags().with_user_access(true)),
                );
                self.tables.invalidate(table_window(index));
            }
            false
        } else {
            let frame = alloc.alloc_4k().ok_or(AddressSpaceError::OutOfMemory)?;
            directory.set(
                index,
                PdEntry::make_table(frame, PageEntryBits::new_kernel_rw().with_user_access(user)),
            );
            self.tables.invalidate(table_window(index));
            trace!("Linked page table {frame:?} at directory slot {}", index.as_u16());
            true
        };

        let table = self
            .tables
            .table(index)
            .ok_or(AddressSpaceError::TableUnreachable(index.as_u16()))?;
        if created {
            table.zero();
        }
        Ok(table)
    }

    /// Map `page` to `frame` with `flags`, growing the table if needed.
    ///
    /// Without `forced` the slot must be free. With `forced` whatever was there
    /// is replaced. The frame of a displaced entry is returned, present or
    /// not, so the caller can decide whether to release it.
    ///
    /// # Errors
    /// - [`AddressSpaceError::Occupied`] if the slot is in use and not `forced`.
    /// - Any error of [`ensure_table`](Self::ensure_table).
    pub fn install<A: FrameAlloc>(
        &mut self,
        alloc: &mut A,
        page: VirtualPage<Size4K>,
        frame: PhysicalPage<Size4K>,
        flags: PageEntryBits,
        forced: bool,
    ) -> Result<Option<PhysicalPage<Size4K>>, AddressSpaceError> {
        let (di, ti) = split_indices(page.base());
        let table = self.ensure_table(alloc, di, flags.user_access())?;

        let previous = table.get(ti);
        if !previous.is_free() && !forced {
            return Err(AddressSpaceError::Occupied);
        }

        table.set(ti, PtEntry::make_4k(frame, flags));
        if !previous.is_free() {
            self.tables.invalidate(page);
        }
        Ok(previous.stored_frame())
    }

    /// Clear the entry for `page` and invalidate it.
    ///
    /// Returns the previous entry, or `None` if the table does not exist.
    pub fn clear(&mut self, page: VirtualPage<Size4K>) -> Option<PtEntry> {
        let (di, ti) = split_indices(page.base());
        let table = self.tables.table(di)?;
        let previous = table.get(ti);
        table.set(ti, PtEntry::zero());
        self.tables.invalidate(page);
        Some(previous)
    }

    /// First free page at or after `start`, skipping [reserved](is_reserved)
    /// pages and never reaching the self-map slot.
    ///
    /// A slot whose table does not exist yet counts as free; the table is
    /// created when the page is installed.
    pub fn find_free_slot(&mut self, start: VirtualPage<Size4K>) -> Option<VirtualPage<Size4K>> {
        let (mut di, mut from) = split_indices(start.base());
        while di.as_u16() < SELF_MAP_INDEX {
            let mut next = Some(from);
            while let Some(ti) = next {
                let free = match self.tables.table(di) {
                    None => Some(ti),
                    Some(table) => table.first_free_from(ti),
                };
                let Some(free) = free else {
                    break;
                };
                let page = VirtualPage::containing_address(join_indices(di, free));
                if !is_reserved(page.base()) {
                    return Some(page);
                }
                next = free.next();
            }
            di = di.next()?;
            from = TableIndex::new(0);
        }
        None
    }
}
