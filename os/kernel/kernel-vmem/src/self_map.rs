//! # Self-Map Windows
//!
//! With directory slot [`SELF_MAP_INDEX`] pointing at the directory itself the
//! paging structures of the active address space appear in virtual memory:
//!
//! ```text
//! 0xFFC0_0000 | i << 12   table linked at directory slot i
//! 0xFFFF_F000             the directory
//! ```
//!
//! Frames that are not linked into any table (a fresh directory, for example)
//! are viewed through the scratch page [`SCRATCH_PAGE`], which lives in the
//! table of slot [`SCRATCH_DIRECTORY_INDEX`] next to the kernel stack.

use crate::info::{
    DIRECTORY_WINDOW, SCRATCH_DIRECTORY_INDEX, SCRATCH_PAGE, SELF_MAP_INDEX, STACK_GUARD_PAGE,
    TABLE_WINDOW_BASE,
};
use crate::page_table::{DirectoryIndex, PageDirectory, PageTable, PtEntry, TableIndex};
use crate::table_access::TableAccess;
use crate::PageEntryBits;
use kernel_memory_addresses::{PhysicalPage, Size4K, VirtualAddress, VirtualPage};
use kernel_registers::tlb;

/// Virtual page through which the self-map exposes the table of slot `index`.
#[inline]
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn table_window(index: DirectoryIndex) -> VirtualPage<Size4K> {
    VirtualPage::containing_address(VirtualAddress::new(
        TABLE_WINDOW_BASE | ((index.as_u16() as u32) << 12),
    ))
}

/// Virtual page through which the self-map exposes the directory.
#[inline]
#[must_use]
pub const fn directory_window() -> VirtualPage<Size4K> {
    VirtualPage::containing_address(VirtualAddress::new(DIRECTORY_WINDOW))
}

/// `true` if `va` falls into the 4 MiB covered by the self-map slot.
#[inline]
#[must_use]
pub const fn is_self_map(va: VirtualAddress) -> bool {
    DirectoryIndex::from(va).as_u16() == SELF_MAP_INDEX
}

/// `true` if `va` is in a page no mapping may be placed in: the self-map
/// window, the [`SCRATCH_PAGE`] used by [`RecursiveWindow::with_frame`], and
/// the [`STACK_GUARD_PAGE`].
#[inline]
#[must_use]
pub const fn is_reserved(va: VirtualAddress) -> bool {
    let page = va.page::<Size4K>().base().as_u32();
    is_self_map(va) || page == SCRATCH_PAGE || page == STACK_GUARD_PAGE
}

/// [`TableAccess`] over the active address space through the self-map.
pub struct RecursiveWindow {
    _private: (),
}

impl RecursiveWindow {
    /// # Safety
    /// Paging must be enabled with a directory whose slot 1023 refers to
    /// itself, and whose slot 1022 links a table (the scratch page lives
    /// there). Only one `RecursiveWindow` may be in use at a time.
    #[inline]
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }

    const fn scratch_page() -> VirtualPage<Size4K> {
        VirtualPage::containing_address(VirtualAddress::new(SCRATCH_PAGE))
    }
}

impl TableAccess for RecursiveWindow {
    fn directory(&mut self) -> &mut PageDirectory {
        unsafe { &mut *directory_window().base().as_mut_ptr::<PageDirectory>() }
    }

    fn table(&mut self, index: DirectoryIndex) -> Option<&mut PageTable> {
        if !self.directory().get(index).is_present() {
            return None;
        }
        Some(unsafe { &mut *table_window(index).base().as_mut_ptr::<PageTable>() })
    }

    fn with_frame<R>(
        &mut self,
        frame: PhysicalPage<Size4K>,
        f: impl FnOnce(&mut PageDirectory) -> R,
    ) -> Option<R> {
        let scratch = Self::scratch_page();
        let slot = TableIndex::from(scratch.base());
        let holder = DirectoryIndex::new(SCRATCH_DIRECTORY_INDEX);

        let table = self.table(holder)?;
        if !table.get(slot).is_free() {
            // Someone mapped over the scratch page; leave their mapping alone.
            return None;
        }
        table.set(slot, PtEntry::make_4k(frame, PageEntryBits::new_kernel_rw()));
        tlb::invlpg(scratch.base());

        let result = f(unsafe { &mut *scratch.base().as_mut_ptr::<PageDirectory>() });

        if let Some(table) = self.table(holder) {
            table.set(slot, PtEntry::zero());
        }
        tlb::invlpg(scratch.base());
        Some(result)
    }

    #[inline]
    fn invalidate(&mut self, page: VirtualPage<Size4K>) {
        tlb::invlpg(page.base());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows() {
        assert_eq!(table_window(DirectoryIndex::new(0)).base().as_u32(), 0xFFC0_0000);
        assert_eq!(table_window(DirectoryIndex::new(0x300)).base().as_u32(), 0xFFF0_0000);
        assert_eq!(table_window(DirectoryIndex::new(1023)), directory_window());
    }

    #[test]
    fn self_map_range() {
        assert!(is_self_map(VirtualAddress::new(0xFFC0_0000)));
        assert!(is_self_map(VirtualAddress::new(0xFFFF_FFFF)));
        assert!(!is_self_map(VirtualAddress::new(0xFFBF_F000)));
        assert!(!is_self_map(VirtualAddress::new(SCRATCH_PAGE)));
    }

    #[test]
    fn reserved_pages() {
        assert!(is_reserved(VirtualAddress::new(0xFFBE_E000)));
        assert!(is_reserved(VirtualAddress::new(0xFFBE_EFFF)));
        assert!(is_reserved(VirtualAddress::new(0xFFBE_F800)));
        assert!(is_reserved(VirtualAddress::new(0xFFFF_F000)));
        assert!(!is_reserved(VirtualAddress::new(0xFFBE_D000)));
        assert!(!is_reserved(VirtualAddress::new(0xFFBF_0000)));
    }
}
