//! # Memory Layout

/// Size of a page, frame, table and directory in bytes.
pub const PAGE_SIZE: u32 = 4096;

/// Number of entries in a directory or a table.
pub const ENTRIES_PER_TABLE: usize = 1024;

/// Where the kernel executes (VMA). The kernel is linked at
/// `HIGHER_HALF_BASE + physical address`.
pub const HIGHER_HALF_BASE: u32 = 0xC000_0000;

/// Where the bytes are placed in *physical* memory (LMA) before paging.
pub const PHYS_LOAD: u32 = 0x0010_0000; // 1 MiB

/// Low memory kept identity mapped so BIOS data, the VGA buffer and the
/// paging switch code stay reachable right after translation is enabled.
pub const IDENTITY_LOW_BYTES: u32 = 0x0010_0000; // 1 MiB

/// Number of page tables the bootstrap builder reserves for the kernel image.
/// Bounds the kernel image to 12 MiB including its in-slot start offset.
pub const BOOTSTRAP_KERNEL_TABLES: usize = 3;

/// Directory slot pointing back at the directory itself.
pub const SELF_MAP_INDEX: u16 = 1023;

/// Virtual address at which the self-map exposes the directory.
pub const DIRECTORY_WINDOW: u32 = 0xFFFF_F000;

/// Virtual address at which the self-map exposes table 0; table `i` is at
/// `TABLE_WINDOW_BASE | i << 12`.
pub const TABLE_WINDOW_BASE: u32 = 0xFFC0_0000;

/// The size of the kernel stack.
pub const KERNEL_STACK_SIZE: u32 = 64 * 1024;

/// Highest byte of the kernel stack, just below the self-map window.
pub const KERNEL_STACK_TOP: u32 = TABLE_WINDOW_BASE - 1;

/// Lowest address of the kernel stack.
pub const KERNEL_STACK_START: u32 = KERNEL_STACK_TOP - KERNEL_STACK_SIZE + 1;

/// Always unmapped, so running off the bottom of the kernel stack faults.
pub const STACK_GUARD_PAGE: u32 = KERNEL_STACK_START - PAGE_SIZE;

/// Page used to temporarily view frames that are not linked into any table,
/// such as a freshly allocated directory. Sits below the stack guard page.
pub const SCRATCH_PAGE: u32 = STACK_GUARD_PAGE - PAGE_SIZE;

/// Directory slot whose table holds the kernel stack and the scratch page.
/// The bootstrap builder links a table here so the slot always exists.
#[allow(clippy::cast_possible_truncation)]
pub const SCRATCH_DIRECTORY_INDEX: u16 = (SCRATCH_PAGE >> 22) as u16;

/// Virtual address of the VGA text buffer.
pub const VGA_BUFFER_VADDR: u32 = 0xB000_0000;

/// Physical address of the VGA text buffer.
pub const VGA_BUFFER_PADDR: u32 = 0x000B_8000;

/// Size of the VGA text buffer.
pub const VGA_BUFFER_SIZE: u32 = 4096;

/// The firmware reports memory above 1 MiB; the frame bitmap covers
/// `UPPER_MEMORY_BASE + upper memory`.
pub const UPPER_MEMORY_BASE: u32 = 0x0010_0000;

/// Translate a higher-half kernel address to its physical load address.
#[inline]
#[must_use]
pub const fn kernel_virtual_to_physical(va: u32) -> u32 {
    va - HIGHER_HALF_BASE
}

#[allow(clippy::cast_lossless)]
const _: () = {
    assert!(KERNEL_STACK_SIZE.is_multiple_of(PAGE_SIZE));
    assert!(KERNEL_STACK_START.is_multiple_of(PAGE_SIZE));
    assert!(SCRATCH_PAGE.is_multiple_of(PAGE_SIZE));
    assert!(SCRATCH_PAGE >> 22 == STACK_GUARD_PAGE >> 22);
    assert!(HIGHER_HALF_BASE.is_multiple_of(4 * 1024 * 1024));
    assert!(PHYS_LOAD.is_multiple_of(PAGE_SIZE));
    assert!(VGA_BUFFER_VADDR < HIGHER_HALF_BASE);
    assert!(VGA_BUFFER_PADDR < IDENTITY_LOW_BYTES);
    // Stack and scratch page share the reserved slot right below the self-map.
    assert!(KERNEL_STACK_START >> 22 == SCRATCH_DIRECTORY_INDEX as u32);
    assert!(SCRATCH_DIRECTORY_INDEX + 1 == SELF_MAP_INDEX);
    assert!(TABLE_WINDOW_BASE == (SELF_MAP_INDEX as u32) << 22);
    assert!(DIRECTORY_WINDOW == TABLE_WINDOW_BASE | (SELF_MAP_INDEX as u32) << 12);
    assert!(
        (HIGHER_HALF_BASE >> 22) as usize + BOOTSTRAP_KERNEL_TABLES
            <= SCRATCH_DIRECTORY_INDEX as usize
    );
};
