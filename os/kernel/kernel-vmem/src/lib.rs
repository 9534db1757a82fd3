//! # Virtual Memory Support
//!
//! 32-bit x86 paging helpers for the kernel and its bootstrap stub.
//!
//! ## What you get
//! - A [`PageEntryBits`] codec for the 32-bit entry format shared by
//!   directory and table entries.
//! - 4 KiB-aligned [`PageDirectory`] and [`PageTable`] wrappers with typed
//!   indices.
//! - The [`TableAccess`] seam through which every table is reached, with a
//!   [self-map](self_map::RecursiveWindow) implementation for the live kernel
//!   and a [physical](table_access::PhysWindow) one for identity-mapped
//!   memory and tests.
//! - [`AddressSpace`] primitives: grow a table on demand, install, clear and
//!   read entries, probe for a free slot.
//! - The [bootstrap](bootstrap) page builder that creates the very first
//!   directory before paging is on.
//! - A tiny allocator/mapper interface ([`FrameAlloc`], [`PhysMapper`]).
//!
//! ## x86 Virtual Address → Physical Address Walk
//!
//! Each 32-bit virtual address is divided into three fields:
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | Directory | Table | Offset |
//! ```
//!
//! ```text
//!  CR3 → Directory (1024 × PDE) → Table (1024 × PTE) → 4 KiB page
//! ```
//!
//! ### The self-map
//!
//! Directory slot 1023 points at the directory itself. Walking through that
//! slot turns the directory into a table of tables, so:
//!
//! - the directory is visible at `0xFFFF_F000`,
//! - table `i` is visible at `0xFFC0_0000 | i << 12`.
//!
//! The slot is owned by the memory manager and never handed out as a mapping.

#![cfg_attr(not(any(test, doctest, feature = "testing")), no_std)]
#![allow(unsafe_code)]

pub mod address_space;
pub mod bootstrap;
mod page_entry_bits;
pub mod page_table;
pub mod self_map;
pub mod table_access;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use crate::address_space::{AddressSpace, AddressSpaceError};
pub use crate::page_entry_bits::PageEntryBits;
pub use crate::page_table::{DirectoryIndex, PageDirectory, PageTable, PdEntry, PtEntry, TableIndex};
pub use crate::table_access::TableAccess;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};

/// Re-export constants as info module.
pub use kernel_info::memory as info;

/// Minimal frame allocator used to obtain **physical** 4 KiB frames
/// for page tables and mapped pages.
///
/// Returns `None` on out-of-memory.
pub trait FrameAlloc {
    /// Allocate one 4 KiB *physical* frame.
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>>;

    /// Return a frame previously handed out by [`alloc_4k`](Self::alloc_4k).
    fn free_4k(&mut self, frame: PhysicalPage<Size4K>);
}

/// Converts physical addresses to usable references in the current address
/// space (identity map before paging, simulated RAM in tests).
///
/// # Safety
/// - `pa` must be mapped writable in the current address space for `&mut T`.
/// - Lifetime `'a` is purely borrow-checked; the mapping must remain valid
///   for `'a`.
/// - Type `T` must match the bytes at `pa`.
pub trait PhysMapper {
    /// Convert a *physical* address to a usable mutable reference.
    ///
    /// # Safety
    /// See the trait documentation.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysicalAddress) -> &'a mut T;
}
