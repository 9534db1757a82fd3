use core::fmt::Debug;
use core::hash::Hash;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Size4K {}
    impl Sealed for super::Size4M {}
}

/// Page granularity marker. Only [`Size4K`] and [`Size4M`] implement it.
pub trait PageSize: sealed::Sealed + Copy + Ord + Hash + Debug {
    /// Bytes per page.
    const SIZE: u32 = 1 << Self::SHIFT;
    /// Width of the in-page offset.
    const SHIFT: u32;
    /// Offset bits, `SIZE - 1`.
    const MASK: u32 = Self::SIZE - 1;
    /// Short name used when formatting pages.
    const NAME: &'static str;
}

/// A frame, or a page mapped by one table entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;

impl PageSize for Size4K {
    const SHIFT: u32 = 12;
    const NAME: &'static str = "4K";
}

/// The range one directory entry covers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4M;

impl PageSize for Size4M {
    const SHIFT: u32 = 22;
    const NAME: &'static str = "4M";
}
