use bitfield_struct::bitfield;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// One 32-bit paging entry, directory or table level alike.
///
/// A directory entry's address names a page table, a table entry's names the
/// mapped 4 KiB frame. Mapping calls also take this type as their flag set;
/// the address field is ignored there and only the low byte is kept (see
/// [`PageEntryBits::DEFINED_FLAGS_MASK`]).
///
/// ```text
///  31                  12 11   8  7  6  5  4   3   2  1  0
/// +----------------------+------+--+--+--+---+---+--+--+--+
/// | frame bits [31:12]   | OS   |PS|D |A |PCD|PWT|US|W |P |
/// +----------------------+------+--+--+--+---+---+--+--+--+
/// ```
///
/// ```rust
/// # use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};
/// # use kernel_vmem::PageEntryBits;
/// let frame = PhysicalPage::from_addr(PhysicalAddress::new(0x0012_3000));
/// let e = PageEntryBits::new_kernel_rw().with_physical_page(frame);
/// assert_eq!(e.into_bits(), 0x0012_3003);
/// ```
#[bitfield(u32)]
#[derive(Eq, PartialEq)]
pub struct PageEntryBits {
    pub present: bool,
    /// Supervisor writes only honour this with CR0.WP set.
    pub writable: bool,
    /// Ring 3 needs this at both levels.
    pub user_access: bool,
    pub write_through: bool,
    pub cache_disabled: bool,
    /// CPU-maintained.
    pub accessed: bool,
    /// CPU-maintained, leaves only.
    pub dirty: bool,
    /// 4 MiB directory leaf. Never produced, kept so it round-trips.
    pub large_page: bool,
    #[bits(4)]
    pub os_available: u8,
    #[bits(20)]
    frame_bits: u32,
}

impl PageEntryBits {
    /// Mask of the eight flag bits the memory manager stores.
    pub const DEFINED_FLAGS_MASK: u32 = 0xFF;

    #[inline]
    pub const fn set_physical_address(&mut self, phys: PhysicalAddress) {
        self.set_frame_bits(phys.as_u32() >> 12);
    }

    #[inline]
    #[must_use]
    pub const fn physical_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame_bits() << 12)
    }

    #[inline]
    #[must_use]
    pub const fn with_physical_page(mut self, page: PhysicalPage<Size4K>) -> Self {
        self.set_physical_address(page.base());
        self
    }

    #[inline]
    #[must_use]
    pub const fn physical_page(&self) -> PhysicalPage<Size4K> {
        PhysicalPage::from_addr(self.physical_address())
    }

    /// Only the defined flag bits, with the address and OS bits cleared.
    #[inline]
    #[must_use]
    pub const fn defined_flags(self) -> Self {
        Self::from_bits(self.into_bits() & Self::DEFINED_FLAGS_MASK)
    }

    /// `true` if every bit of the entry is clear.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.into_bits() == 0
    }

    /// Present, writable, supervisor only.
    #[inline]
    #[must_use]
    pub const fn new_kernel_rw() -> Self {
        Self::new().with_present(true).with_writable(true)
    }

    /// Present, read-only, supervisor only.
    #[inline]
    #[must_use]
    pub const fn new_kernel_ro() -> Self {
        Self::new().with_present(true)
    }

    /// Present, writable, user accessible.
    #[inline]
    #[must_use]
    pub const fn new_user_rw() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_user_access(true)
    }

    /// Flags of the self-referential directory slot.
    #[inline]
    #[must_use]
    pub const fn new_self_map() -> Self {
        Self::new()
            .with_present(true)
            .with_writable(true)
            .with_cache_disabled(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bit_positions() {
        assert_eq!(PageEntryBits::new().with_present(true).into_bits(), 1 << 0);
        assert_eq!(PageEntryBits::new().with_writable(true).into_bits(), 1 << 1);
        assert_eq!(PageEntryBits::new().with_user_access(true).into_bits(), 1 << 2);
        assert_eq!(PageEntryBits::new().with_write_through(true).into_bits(), 1 << 3);
        assert_eq!(PageEntryBits::new().with_cache_disabled(true).into_bits(), 1 << 4);
        assert_eq!(PageEntryBits::new().with_accessed(true).into_bits(), 1 << 5);
        assert_eq!(PageEntryBits::new().with_dirty(true).into_bits(), 1 << 6);
        assert_eq!(PageEntryBits::new().with_large_page(true).into_bits(), 1 << 7);
    }

    #[test]
    fn address_does_not_leak_into_flags() {
        let e = PageEntryBits::new_kernel_rw()
            .with_physical_page(PhysicalPage::from_addr(PhysicalAddress::new(0xFFFF_F000)));
        assert_eq!(e.into_bits(), 0xFFFF_F003);
        assert_eq!(e.physical_address(), PhysicalAddress::new(0xFFFF_F000));
        assert_eq!(e.defined_flags(), PageEntryBits::new_kernel_rw());
    }

    #[test]
    fn decode_raw_entry() {
        let e = PageEntryBits::from_bits(0x00B8_0F13);
        assert!(e.present());
        assert!(e.writable());
        assert!(!e.user_access());
        assert!(e.cache_disabled());
        assert_eq!(e.os_available(), 0xF);
        assert_eq!(e.physical_address(), PhysicalAddress::new(0x00B8_0000));
        assert_eq!(e.defined_flags().into_bits(), 0x13);
    }

    #[test]
    fn self_map_flags() {
        assert_eq!(PageEntryBits::new_self_map().into_bits(), 0x13);
    }
}
