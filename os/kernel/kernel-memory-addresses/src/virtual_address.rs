use crate::{MemoryAddress, VirtualPage};

/// An address as the CPU issues it, translated by the active page directory.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(pub(crate) MemoryAddress);

typed_address!(VirtualAddress, VirtualPage, "va");

impl VirtualAddress {
    /// The address as a pointer. Only meaningful while it is mapped.
    #[inline]
    #[must_use]
    pub const fn as_mut_ptr<T>(self) -> *mut T {
        self.as_usize() as *mut T
    }
}
