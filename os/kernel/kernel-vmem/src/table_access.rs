//! # Table Access
//!
//! All page-table reads and writes go through [`TableAccess`]. The live kernel
//! reaches its tables through the self-map windows
//! ([`RecursiveWindow`](crate::self_map::RecursiveWindow)); code running with
//! an identity map, and the host tests, reach them through a [`PhysMapper`]
//! ([`PhysWindow`]).

use crate::page_table::{DirectoryIndex, PageDirectory, PageTable};
use crate::PhysMapper;
use kernel_memory_addresses::{PhysicalPage, Size4K, VirtualPage};

/// A view of one address space's directory and tables.
pub trait TableAccess {
    /// The directory of the address space.
    fn directory(&mut self) -> &mut PageDirectory;

    /// The table linked at directory slot `index`, or `None` if the slot is not
    /// present.
    fn table(&mut self, index: DirectoryIndex) -> Option<&mut PageTable>;

    /// Temporarily view `frame`, which need not be linked anywhere, as a
    /// directory and run `f` on it.
    ///
    /// Returns `None` if the view cannot be established.
    fn with_frame<R>(
        &mut self,
        frame: PhysicalPage<Size4K>,
        f: impl FnOnce(&mut PageDirectory) -> R,
    ) -> Option<R>;

    /// Drop any cached translation of `page`.
    fn invalidate(&mut self, page: VirtualPage<Size4K>);
}

/// Reaches every table by physical address through a [`PhysMapper`].
///
/// There is no TLB behind this view, so [`invalidate`](TableAccess::invalidate)
/// does nothing.
pub struct PhysWindow<'m, M: PhysMapper> {
    mapper: &'m M,
    root: PhysicalPage<Size4K>,
}

impl<'m, M: PhysMapper> PhysWindow<'m, M> {
    /// View the address space whose directory lives in `root`.
    #[inline]
    pub const fn new(mapper: &'m M, root: PhysicalPage<Size4K>) -> Self {
        Self { mapper, root }
    }

    /// Frame holding the directory.
    #[inline]
    pub const fn root(&self) -> PhysicalPage<Size4K> {
        self.root
    }
}

impl<M: PhysMapper> TableAccess for PhysWindow<'_, M> {
    fn directory(&mut self) -> &mut PageDirectory {
        unsafe { self.mapper.phys_to_mut::<PageDirectory>(self.root.base()) }
    }

    fn table(&mut self, index: DirectoryIndex) -> Option<&mut PageTable> {
        let frame = self.directory().get(index).next_table()?;
        Some(unsafe { self.mapper.phys_to_mut::<PageTable>(frame.base()) })
    }

    fn with_frame<R>(
        &mut self,
        frame: PhysicalPage<Size4K>,
        f: impl FnOnce(&mut PageDirectory) -> R,
    ) -> Option<R> {
        let view = unsafe { self.mapper.phys_to_mut::<PageDirectory>(frame.base()) };
        Some(f(view))
    }

    #[inline]
    fn invalidate(&mut self, _page: VirtualPage<Size4K>) {}
}
