//! # Typed 32-bit Addresses
//!
//! Newtypes over `u32` that keep physical and virtual addresses apart, plus
//! page bases and in-page offsets parameterized by a [`PageSize`] marker.
//!
//! | Raw                         | Physical              | Virtual              |
//! |-----------------------------|-----------------------|----------------------|
//! | [`MemoryAddress`]           | [`PhysicalAddress`]   | [`VirtualAddress`]   |
//! | [`MemoryPage<S>`]           | [`PhysicalPage<S>`]   | [`VirtualPage<S>`]   |
//! | [`MemoryAddressOffset<S>`]  | shared                | shared               |
//!
//! Two sizes exist: [`Size4K`] is the frame and mapping granularity, [`Size4M`]
//! is the span one directory entry covers.
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let va = VirtualAddress::new(0xC010_1234);
//! let (page, off) = va.split::<Size4K>();
//! assert_eq!(page.base().as_u32(), 0xC010_1000);
//! assert_eq!(off.as_u32(), 0x234);
//! assert_eq!(page.join(off), va);
//!
//! let pa = PhysicalAddress::new(0x0010_0042);
//! assert_eq!(pa.page::<Size4K>().frame_number(), 0x100);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

/// Accessors shared by [`PhysicalAddress`] and [`VirtualAddress`].
///
/// `$page` is the matching page wrapper; both wrap the raw types in field `0`.
macro_rules! typed_address {
    ($name:ident, $page:ident, $tag:literal) => {
        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(raw: u32) -> Self {
                Self($crate::MemoryAddress::new(raw))
            }

            #[inline]
            #[must_use]
            pub const fn zero() -> Self {
                Self::new(0)
            }

            #[inline]
            #[must_use]
            pub const fn as_u32(self) -> u32 {
                self.0.as_u32()
            }

            #[inline]
            #[must_use]
            pub const fn as_usize(self) -> usize {
                self.0.as_usize()
            }

            #[inline]
            #[must_use]
            pub const fn is_null(self) -> bool {
                self.0.is_null()
            }

            #[inline]
            #[must_use]
            pub const fn is_aligned<S: $crate::PageSize>(self) -> bool {
                self.0.is_aligned::<S>()
            }

            /// The `S` page containing this address.
            #[inline]
            #[must_use]
            pub const fn page<S: $crate::PageSize>(self) -> $page<S> {
                $page(self.0.page::<S>())
            }

            #[inline]
            #[must_use]
            pub const fn offset<S: $crate::PageSize>(self) -> $crate::MemoryAddressOffset<S> {
                self.0.offset::<S>()
            }

            #[inline]
            #[must_use]
            pub const fn split<S: $crate::PageSize>(
                self,
            ) -> ($page<S>, $crate::MemoryAddressOffset<S>) {
                (self.page::<S>(), self.offset::<S>())
            }

            /// `None` past the top of the 32-bit space.
            #[inline]
            #[must_use]
            pub const fn checked_add(self, bytes: u32) -> Option<Self> {
                match self.0.checked_add(bytes) {
                    Some(raw) => Some(Self(raw)),
                    None => None,
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!($tag, ":{}"), self.0)
            }
        }
    };
}

/// Accessors shared by [`PhysicalPage`] and [`VirtualPage`].
macro_rules! typed_page {
    ($name:ident, $addr:ident, $tag:literal) => {
        impl<S: $crate::PageSize> $name<S> {
            #[inline]
            #[must_use]
            pub const fn from_page(page: $crate::MemoryPage<S>) -> Self {
                Self(page)
            }

            /// Round `addr` down to its page.
            #[inline]
            #[must_use]
            pub const fn containing_address(addr: $addr) -> Self {
                Self($crate::MemoryPage::from_addr(addr.0))
            }

            #[inline]
            #[must_use]
            pub const fn base(self) -> $addr {
                $addr(self.0.base())
            }

            #[inline]
            #[must_use]
            pub const fn join(self, off: $crate::MemoryAddressOffset<S>) -> $addr {
                $addr(self.0.join(off))
            }
        }

        impl<S: $crate::PageSize> core::fmt::Display for $name<S> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl<S: $crate::PageSize> core::fmt::Debug for $name<S> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!($tag, ":{}"), self.0)
            }
        }
    };
}

mod memory_address;
mod memory_address_offset;
mod memory_page;
mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;
mod virtual_page;

pub use memory_address::MemoryAddress;
pub use memory_address_offset::MemoryAddressOffset;
pub use memory_page::MemoryPage;
pub use page_size::{PageSize, Size4K, Size4M};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;
pub use virtual_page::VirtualPage;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_split() {
        let a = MemoryAddress::new(0x89AB_CDEF);
        let (p, o) = a.split::<Size4K>();
        assert_eq!(p.base().as_u32(), 0x89AB_C000);
        assert_eq!(o.as_u32(), 0xDEF);
        assert_eq!(p.join(o), a);
    }

    #[test]
    fn directory_span_split() {
        let a = MemoryAddress::new(0xC012_3456);
        let (p, o) = a.split::<Size4M>();
        assert_eq!(p.base().as_u32(), 0xC000_0000);
        assert_eq!(p.number(), 0x300);
        assert_eq!(o.as_u32(), 0x12_3456);
    }

    #[test]
    fn stack_page_and_vga_frame() {
        let (vp, vo) = VirtualAddress::new(0xFFBF_0123).split::<Size4K>();
        assert_eq!(vp.page_number(), 0xFFBF0);
        assert_eq!(vo.as_u32(), 0x123);

        let pa = PhysicalAddress::new(0x000B_8042);
        let (pp, po) = pa.split::<Size4K>();
        assert_eq!(pp.frame_number(), 0xB8);
        assert_eq!(pp.join(po), pa);
    }

    #[test]
    fn numbered_pages() {
        let pp = PhysicalPage::<Size4K>::from_frame_number(0x1234);
        assert_eq!(pp.base().as_u32(), 0x0123_4000);
        assert_eq!(pp.frame_number(), 0x1234);

        let vp = VirtualPage::<Size4K>::from_page_number(0xC0000);
        assert_eq!(vp.base(), VirtualAddress::new(0xC000_0000));
    }

    #[test]
    fn rounding() {
        let a = MemoryAddress::new(0x12345);
        assert_eq!(a.align_down::<Size4K>().as_u32(), 0x12000);
        assert_eq!(a.align_up::<Size4K>(), Some(MemoryAddress::new(0x13000)));
        assert_eq!(
            MemoryAddress::new(0x13000).align_up::<Size4K>(),
            Some(MemoryAddress::new(0x13000))
        );
        assert_eq!(MemoryAddress::new(0xFFFF_F001).align_up::<Size4K>(), None);
        assert!(!a.is_aligned::<Size4K>());
    }

    #[test]
    fn adding_past_the_top_fails() {
        let top = VirtualAddress::new(0xFFFF_F000);
        assert_eq!(top.checked_add(0xFFF), Some(VirtualAddress::new(0xFFFF_FFFF)));
        assert_eq!(top.checked_add(0x1000), None);
    }

    #[test]
    fn debug_names_the_space() {
        assert_eq!(format!("{:?}", PhysicalAddress::new(0xB8000)), "pa:0x000B8000");
        assert_eq!(format!("{:?}", VirtualAddress::new(0xC000_0000)), "va:0xC0000000");
        assert_eq!(
            format!("{:?}", VirtualPage::<Size4K>::from_page_number(1)),
            "vpage:0x00001000/4K"
        );
    }
}
