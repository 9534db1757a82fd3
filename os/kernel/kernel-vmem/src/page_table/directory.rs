//! Top level: 1024 entries, each naming the [`PageTable`](crate::PageTable)
//! for a 4 MiB span. No 4 MiB leaves are ever written. Slot 1023 points back
//! at the directory itself.

use crate::PageEntryBits;
use kernel_memory_addresses::{PhysicalPage, Size4K, VirtualAddress};

/// Bits `[31:22]` of a virtual address.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DirectoryIndex(u16);

/// Directory entry.
#[doc(alias = "PDE")]
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PdEntry(PageEntryBits);

/// One frame worth of [`PdEntry`].
#[doc(alias = "PD")]
#[repr(C, align(4096))]
pub struct PageDirectory {
    entries: [PdEntry; 1024],
}

impl DirectoryIndex {
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(va: VirtualAddress) -> Self {
        Self((va.as_u32() >> 22) as u16)
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

    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
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

impl PdEntry {
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
    pub const fn flags(self) -> PageEntryBits {
        self.0
    }

    /// Table frame, if linked.
    #[inline]
    #[must_use]
    pub const fn next_table(self) -> Option<PhysicalPage<Size4K>> {
        if self.is_present() {
            Some(self.0.physical_page())
        } else {
            None
        }
    }

    /// Link the table in `page`. Always present, never `PS`.
    #[inline]
    #[must_use]
    pub const fn make_table(page: PhysicalPage<Size4K>, flags: PageEntryBits) -> Self {
        Self(
            flags
                .defined_flags()
                .with_present(true)
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

impl PageDirectory {
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            entries: [PdEntry::zero(); 1024],
        }
    }

    #[inline]
    pub fn zero(&mut self) {
        self.entries.fill(PdEntry::zero());
    }

    #[inline]
    #[must_use]
    pub const fn get(&self, i: DirectoryIndex) -> PdEntry {
        self.entries[i.as_usize()]
    }

    /// No TLB maintenance.
    #[inline]
    pub const fn set(&mut self, i: DirectoryIndex, e: PdEntry) {
        self.entries[i.as_usize()] = e;
    }

    #[inline]
    #[must_use]
    pub const fn index_of(va: VirtualAddress) -> DirectoryIndex {
        DirectoryIndex::from(va)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_memory_addresses::PhysicalAddress;

    #[test]
    fn table_link_forces_present_and_small_pages() {
        let page = PhysicalPage::from_addr(PhysicalAddress::new(0x0040_2000));
        let e = PdEntry::make_table(page, PageEntryBits::new().with_large_page(true).with_writable(true));
        assert_eq!(e.raw(), 0x0040_2003);
        assert_eq!(e.next_table(), Some(page));
        assert_eq!(PdEntry::zero().next_table(), None);
    }

    #[test]
    fn index_bounds() {
        assert_eq!(DirectoryIndex::new(1022).next(), Some(DirectoryIndex::new(1023)));
        assert_eq!(DirectoryIndex::new(1023).next(), None);
        assert_eq!(
            PageDirectory::index_of(VirtualAddress::new(0xFFC0_0000)).as_u16(),
            1023
        );
    }
}
