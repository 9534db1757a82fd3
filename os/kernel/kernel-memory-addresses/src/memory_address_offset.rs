use crate::{MemoryAddress, PageSize};
use core::fmt;
use core::marker::PhantomData;

/// Low `S::SHIFT` bits of an address.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MemoryAddressOffset<S: PageSize> {
    bytes: u32,
    size: PhantomData<S>,
}

impl<S: PageSize> MemoryAddressOffset<S> {
    /// Bits above the page size are dropped; debug builds assert there are none.
    #[inline]
    #[must_use]
    pub const fn new(bytes: u32) -> Self {
        debug_assert!(bytes <= S::MASK, "offset exceeds the page");
        Self {
            bytes: bytes & S::MASK,
            size: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn from_addr(addr: MemoryAddress) -> Self {
        Self::new(addr.as_u32() & S::MASK)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.bytes
    }
}

impl<S: PageSize> fmt::Debug for MemoryAddressOffset<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{:#x}/{}", self.bytes, S::NAME)
    }
}
