use crate::{MemoryPage, PhysicalAddress, Size4K};

/// Physical page base. At [`Size4K`] this is a frame.
///
/// ```rust
/// # use kernel_memory_addresses::*;
/// let frame = PhysicalPage::<Size4K>::from_frame_number(256);
/// assert_eq!(frame.base(), PhysicalAddress::new(0x0010_0000));
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalPage<S: crate::PageSize>(pub(crate) MemoryPage<S>);

typed_page!(PhysicalPage, PhysicalAddress, "frame");

impl<S: crate::PageSize> PhysicalPage<S> {
    /// Same as [`PhysicalPage::containing_address`].
    #[inline]
    #[must_use]
    pub const fn from_addr(addr: PhysicalAddress) -> Self {
        Self::containing_address(addr)
    }
}

impl PhysicalPage<Size4K> {
    #[inline]
    #[must_use]
    pub const fn from_frame_number(frame: u32) -> Self {
        Self(MemoryPage::from_number(frame))
    }

    /// Index of this frame in the allocator bitmap.
    #[inline]
    #[must_use]
    pub const fn frame_number(self) -> u32 {
        self.0.number()
    }
}
