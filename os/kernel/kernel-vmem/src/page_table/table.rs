//! Second level: 1024 entries, each mapping one 4 KiB page.
//!
//! Writes here do not touch the TLB; whoever changes a live mapping flushes.

use crate::PageEntryBits;
use kernel_memory_addresses::{PhysicalPage, Size4K, VirtualAddress};

/// Bits `[21:12]` of a virtual address.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

/// Table entry. A slot only counts as free when the whole word is zero, so a
/// cleared present bit with a stale frame still blocks new mappings.
#[doc(alias = "PTE")]
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PtEntry(PageEntryBits);

/// One frame worth of [`PtEntry`].
#[doc(alias = "PT")]
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PtEntry; 1024],
}

impl TableIndex {
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self(((va.as_u32() >> 12) & 0x3FF) as u16)
    }

    /// Debug builds reject `v >= 1024`.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!(v < 1024);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// The next index, or `None` past the last slot.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        if self.0 < 1023 {
            Some(Self(self.0 + 1))
        } else {
            None
        }
    }
}

impl PtEntry {
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(PageEntryBits::new())
    }

    #[inline]
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0.present()
    }

    #[inline]
    #[must_use]
    pub const fn is_free(self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub const fn flags(self) -> PageEntryBits {
        self.0
    }

    /// The frame stored in the entry, regardless of the present bit.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> PhysicalPage<Size4K> {
        self.0.physical_page()
    }

    /// The frame of any used entry, present or not.
    ///
    /// This is what a page holds on to; translation uses [`Self::page_4k`].
    #[inline]
    #[must_use]
    pub const fn stored_frame(self) -> Option<PhysicalPage<Size4K>> {
        if self.is_free() {
            None
        } else {
            Some(self.frame())
        }
    }

    /// Frame and defined flags of a present entry.
    #[inline]
    #[must_use]
    pub const fn page_4k(self) -> Option<(PhysicalPage<Size4K>, PageEntryBits)> {
        if self.is_present() {
            Some((self.0.physical_page(), self.0.defined_flags()))
        } else {
            None
        }
    }

    /// Leaf entry for `page`. Flags lose everything above bit 7 and `PS`;
    /// `P` is kept as passed.
    #[inline]
    #[must_use]
    pub const fn make_4k(page: PhysicalPage<Size4K>, flags: PageEntryBits) -> Self {
        Self(
            flags
                .defined_flags()
                .with_large_page(false)
                .with_physical_page(page),
        )
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0.into_bits()
    }

    /// Unchecked.
    #[inline]
    #[must_use]
    pub const fn from_raw(v: u32) -> Self {
        Self(PageEntryBits::from_bits(v))
    }
}

impl PageTable {
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PtEntry::zero(); 1024],
        }
    }

    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(PtEntry::zero());
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: TableIndex) -> PtEntry {
        self.entries[i.as_usize()]
    }

    #[inline]
    pub const fn set(&mut self, i: TableIndex, e: PtEntry) {
        self.entries[i.as_usize()] = e;
    }

    /// First free slot at or after `from`.
    #[must_use]
    pub fn first_free_from(&self, from: TableIndex) -> Option<TableIndex> {
        self.entries[from.as_usize()..]
            .iter()
            .position(|e| e.is_free())
            .map(|pos| Self::index_at(from.as_usize() + pos))
    }

    /// Number of present entries.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_present()).count()
    }

    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> TableIndex {
        TableIndex::from(va)
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn index_at(i: usize) -> TableIndex {
        TableIndex::new(i as u16)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use kernel_memory_addresses::PhysicalAddress;

    #[test]
    fn leaf_entries_drop_os_bits() {
        let frame = PhysicalPage::<Size4K>::from_addr(PhysicalAddress::new(0x5555_0000));
        let e = PtEntry::make_4k(frame, PageEntryBits::new_user_rw().with_os_available(0xA));
        let (p, fl) = e.page_4k().expect("present");
        assert_eq!(p.base().as_u32(), 0x5555_0000);
        assert!(!fl.large_page());
        assert!(fl.user_access());
        assert!(fl.writable());
        assert_eq!(fl.os_available(), 0);
    }

    #[test]
    fn free_slot_probing() {
        let mut t = PageTable::zeroed();
        let frame = PhysicalPage::from_frame_number(7);
        t.set(TableIndex::new(4), PtEntry::make_4k(frame, PageEntryBits::new_kernel_rw()));
        // Non-present but non-zero entries are not free.
        t.set(TableIndex::new(5), PtEntry::from_raw(0x0000_7000));
        assert_eq!(t.first_free_from(TableIndex::new(4)), Some(TableIndex::new(6)));
        assert_eq!(t.first_free_from(TableIndex::new(0)), Some(TableIndex::new(0)));
        assert_eq!(t.present_count(), 1);
    }
}
