use crate::{MemoryAddress, PhysicalPage};

/// An address on the physical bus: RAM, or a device window such as VGA.
///
/// Address zero is a valid location but never an allocation result, since
/// frame 0 is kept out of the allocator.
///
/// ```rust
/// # use kernel_memory_addresses::*;
/// let pa = PhysicalAddress::new(0x000B_8042);
/// let (frame, off) = pa.split::<Size4K>();
/// assert_eq!(frame.frame_number(), 0xB8);
/// assert_eq!(off.as_u32(), 0x42);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(pub(crate) MemoryAddress);

typed_address!(PhysicalAddress, PhysicalPage, "pa");
