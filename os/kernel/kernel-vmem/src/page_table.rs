//! # Memory Page Table
//!
//! The two paging levels of 32-bit x86:
//!
//! - [`PageDirectory`]: 1024 [`PdEntry`] values, one per 4 MiB of virtual space.
//! - [`PageTable`]: 1024 [`PtEntry`] values, one per 4 KiB page.
//!
//! ```text
//! | 31‒22     | 21‒12 | 11‒0   |
//! | Directory | Table | Offset |
//! ```

pub mod directory;
pub mod table;

pub use crate::page_table::directory::{DirectoryIndex, PageDirectory, PdEntry};
pub use crate::page_table::table::{PageTable, PtEntry, TableIndex};
use kernel_memory_addresses::VirtualAddress;

/// Number of entries in a directory and in a table.
pub const ENTRIES: usize = 1024;

/// Split a virtual address into its directory and table index.
#[inline]
#[must_use]
pub const fn split_indices(va: VirtualAddress) -> (DirectoryIndex, TableIndex) {
    (DirectoryIndex::from(va), TableIndex::from(va))
}

/// Rebuild the page base addressed by a directory and table index.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn join_indices(di: DirectoryIndex, ti: TableIndex) -> VirtualAddress {
    VirtualAddress::new(((di.as_usize() as u32) << 22) | ((ti.as_usize() as u32) << 12))
}
