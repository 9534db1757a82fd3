use crate::{MemoryPage, Size4K, VirtualAddress};

/// Virtual page base.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualPage<S: crate::PageSize>(pub(crate) MemoryPage<S>);

typed_page!(VirtualPage, VirtualAddress, "vpage");

impl VirtualPage<Size4K> {
    #[inline]
    #[must_use]
    pub const fn from_page_number(number: u32) -> Self {
        Self(MemoryPage::from_number(number))
    }

    #[inline]
    #[must_use]
    pub const fn page_number(self) -> u32 {
        self.0.number()
    }
}
