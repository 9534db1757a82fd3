//! # Bootstrap Page Builder
//!
//! Builds the very first address space while translation is still off. The
//! caller provides one statically reserved, page-aligned [`BootstrapPageBlock`]
//! and its physical address; everything is written by physical address and no
//! memory is allocated.
//!
//! The resulting directory:
//!
//! | Slot                      | Table         | Contents |
//! |---------------------------|---------------|----------|
//! | 0                         | `tables[0]`   | first 1 MiB and the loader stub, identity |
//! | `start >> 22` ..+3        | `tables[1..4]`| kernel image, remapped to the higher half |
//! | [`SCRATCH_DIRECTORY_INDEX`]| `tables[4]`  | empty; later holds the stack and scratch page |
//! | [`SELF_MAP_INDEX`]        | directory     | self-map |

use crate::info::{
    BOOTSTRAP_KERNEL_TABLES, ENTRIES_PER_TABLE, HIGHER_HALF_BASE, IDENTITY_LOW_BYTES, PAGE_SIZE,
    SCRATCH_DIRECTORY_INDEX, SELF_MAP_INDEX,
};
use crate::page_table::{DirectoryIndex, PageDirectory, PageTable, PdEntry, PtEntry, TableIndex};
use crate::PageEntryBits;
use core::mem::offset_of;
use kernel_info::boot::KernelImage;
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};

/// Index of the identity table in [`BootstrapPageBlock::tables`].
pub const IDENTITY_TABLE: usize = 0;

/// Index of the first kernel table in [`BootstrapPageBlock::tables`].
pub const FIRST_KERNEL_TABLE: usize = 1;

/// Index of the table linked at [`SCRATCH_DIRECTORY_INDEX`].
pub const SCRATCH_TABLE: usize = FIRST_KERNEL_TABLE + BOOTSTRAP_KERNEL_TABLES;

/// Number of tables in the block.
pub const BOOTSTRAP_TABLES: usize = SCRATCH_TABLE + 1;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum BootstrapError {
    #[error("loader stub ends at {0}, past the identity table")]
    LoaderTooLarge(PhysicalAddress),
    #[error("kernel image needs {needed} page tables, more than are reserved for it")]
    KernelImageTooLarge { needed: usize },
    #[error("kernel image [{start}, {end}) is not a valid higher-half range")]
    InvalidKernelImage {
        start: VirtualAddress,
        end: VirtualAddress,
    },
}

/// The directory and every table the bootstrap builder writes, laid out
/// contiguously so their physical addresses follow from the block's own.
#[repr(C, align(4096))]
pub struct BootstrapPageBlock {
    pub directory: PageDirectory,
    pub tables: [PageTable; BOOTSTRAP_TABLES],
}

impl BootstrapPageBlock {
    /// Size of the block in bytes.
    pub const SIZE: usize = size_of::<Self>();

    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            directory: PageDirectory::zeroed(),
            tables: [const { PageTable::zeroed() }; BOOTSTRAP_TABLES],
        }
    }

    /// Clear the directory and every table.
    pub fn zero(&mut self) {
        self.directory.zero();
        for table in &mut self.tables {
            table.zero();
        }
    }

    /// Physical frame of `tables[i]`, given the block's physical address.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn table_frame(block_phys: PhysicalAddress, i: usize) -> PhysicalPage<Size4K> {
        let offset = offset_of!(Self, tables) + i * size_of::<PageTable>();
        PhysicalPage::from_addr(PhysicalAddress::new(block_phys.as_u32() + offset as u32))
    }
}

/// Populate `block` for `image` and return the frame of the new directory.
///
/// `block_phys` is the physical address of `block`. Nothing is activated; the
/// caller loads CR3 and enables paging.
///
/// # Errors
/// - [`BootstrapError::LoaderTooLarge`] if the identity range does not fit one table.
/// - [`BootstrapError::InvalidKernelImage`] if the image is not a higher-half range
///   that leaves the top two directory slots free.
/// - [`BootstrapError::KernelImageTooLarge`] if the image needs more than
///   [`BOOTSTRAP_KERNEL_TABLES`] tables. No kernel entry has been written then.
pub fn build(
    block: &mut BootstrapPageBlock,
    block_phys: PhysicalAddress,
    image: &KernelImage,
) -> Result<PhysicalPage<Size4K>, BootstrapError> {
    debug_assert!(block_phys.is_aligned::<Size4K>(), "bootstrap block must be page aligned");
    let rw = PageEntryBits::new_kernel_rw();

    block.zero();

    // Identity: the first MiB plus the loader stub, so the paging switch
    // keeps executing after CR0.PG is set.
    let identity_end = image.loader_end.as_u32().max(IDENTITY_LOW_BYTES);
    let identity_pages = identity_end.div_ceil(PAGE_SIZE) as usize;
    if identity_pages > ENTRIES_PER_TABLE {
        return Err(BootstrapError::LoaderTooLarge(image.loader_end));
    }
    let identity = &mut block.tables[IDENTITY_TABLE];
    for i in 0..identity_pages {
        let frame = frame_at(i);
        identity.set(table_index(i), PtEntry::make_4k(frame, rw));
    }
    block.directory.set(
        DirectoryIndex::new(0),
        PdEntry::make_table(BootstrapPageBlock::table_frame(block_phys, IDENTITY_TABLE), rw),
    );

    // Kernel image, validated before any kernel entry is written.
    if image.start.as_u32() < HIGHER_HALF_BASE || image.end < image.start {
        return Err(BootstrapError::InvalidKernelImage {
            start: image.start,
            end: image.end,
        });
    }
    let first_slot = DirectoryIndex::from(image.start).as_usize();
    if first_slot + BOOTSTRAP_KERNEL_TABLES > usize::from(SCRATCH_DIRECTORY_INDEX) {
        return Err(BootstrapError::InvalidKernelImage {
            start: image.start,
            end: image.end,
        });
    }
    let first_entry = TableIndex::from(image.start).as_usize();
    let pages = image.page_count() as usize;
    let needed = (first_entry + pages).div_ceil(ENTRIES_PER_TABLE);
    if needed > BOOTSTRAP_KERNEL_TABLES {
        return Err(BootstrapError::KernelImageTooLarge { needed });
    }

    for k in 0..BOOTSTRAP_KERNEL_TABLES {
        block.directory.set(
            directory_index(first_slot + k),
            PdEntry::make_table(
                BootstrapPageBlock::table_frame(block_phys, FIRST_KERNEL_TABLE + k),
                rw,
            ),
        );
    }

    let first_frame = image.physical_start().page::<Size4K>().frame_number() as usize;
    for i in 0..pages {
        let slot = first_entry + i;
        let table = &mut block.tables[FIRST_KERNEL_TABLE + slot / ENTRIES_PER_TABLE];
        table.set(
            table_index(slot % ENTRIES_PER_TABLE),
            PtEntry::make_4k(frame_at(first_frame + i), rw),
        );
    }

    block.directory.set(
        DirectoryIndex::new(SCRATCH_DIRECTORY_INDEX),
        PdEntry::make_table(BootstrapPageBlock::table_frame(block_phys, SCRATCH_TABLE), rw),
    );

    let directory = PhysicalPage::from_addr(block_phys);
    block.directory.set(
        DirectoryIndex::new(SELF_MAP_INDEX),
        PdEntry::make_table(directory, PageEntryBits::new_self_map()),
    );

    Ok(directory)
}

#[allow(clippy::cast_possible_truncation)]
const fn frame_at(n: usize) -> PhysicalPage<Size4K> {
    PhysicalPage::from_frame_number(n as u32)
}

#[allow(clippy::cast_possible_truncation)]
const fn table_index(i: usize) -> TableIndex {
    TableIndex::new(i as u16)
}

#[allow(clippy::cast_possible_truncation)]
const fn directory_index(i: usize) -> DirectoryIndex {
    DirectoryIndex::new(i as u16)
}
