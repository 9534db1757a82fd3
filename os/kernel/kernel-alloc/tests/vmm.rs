use kernel_alloc::frame_alloc::BitmapFrameAlloc;
use kernel_alloc::vmm::{Mapping, Vmm, VmmError};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use kernel_vmem::table_access::PhysWindow;
use kernel_vmem::testing::SimRam;
use kernel_vmem::{DirectoryIndex, PageEntryBits, TableAccess};

const FRAMES: u32 = 64;

type Pmm = BitmapFrameAlloc<8>;

fn va(v: u32) -> VirtualAddress {
    VirtualAddress::new(v)
}

fn pa(v: u32) -> PhysicalAddress {
    PhysicalAddress::new(v)
}

fn rw() -> PageEntryBits {
    PageEntryBits::new_kernel_rw()
}

/// Simulated RAM with every frame but 0 free, and a prepared directory.
fn setup() -> (SimRam, Pmm, PhysicalPage<Size4K>) {
    let ram = SimRam::new(FRAMES);
    let mut pmm = Pmm::new();
    pmm.init(u64::from(FRAMES) * 4096);
    pmm.mark_range_free(1, FRAMES - 1);

    let root = {
        let mut vmm = Vmm::new(PhysWindow::new(&ram, PhysicalPage::from_frame_number(0)), &mut pmm);
        vmm.init_directory().expect("directory")
    };
    (ram, pmm, root)
}

fn directory_words(ram: &SimRam, root: PhysicalPage<Size4K>) -> Vec<u32> {
    (0..1024)
        .map(|i| ram.read_u32(PhysicalAddress::new(root.base().as_u32() + i * 4)))
        .collect()
}

#[test]
fn fresh_directory_has_only_the_self_map() {
    let ram = SimRam::new(FRAMES);
    ram.fill_frame(PhysicalPage::from_frame_number(1), 0x5A);
    let mut pmm = Pmm::new();
    pmm.init(u64::from(FRAMES) * 4096);
    pmm.mark_range_free(1, FRAMES - 1);

    let mut vmm = Vmm::new(PhysWindow::new(&ram, PhysicalPage::from_frame_number(0)), &mut pmm);
    let root = vmm.init_directory().expect("directory");
    assert_eq!(root.frame_number(), 1);

    let words = directory_words(&ram, root);
    assert!(words[..1023].iter().all(|&w| w == 0));
    assert_eq!(words[1023], 0x0000_1013);
}

#[test]
fn map_then_lookup() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    let used = vmm.map_page(va(0x0040_0000), pa(0x0010_0000), rw()).expect("map");
    assert_eq!(used, va(0x0040_0000));

    let mapping = vmm.lookup(va(0x0040_0000));
    assert_eq!(
        mapping,
        Mapping {
            frame: 0x100,
            physical: pa(0x0010_0000),
            flags: rw(),
        }
    );
    assert!(mapping.is_present());
    assert_eq!(vmm.virtual_to_physical(va(0x0040_0ABC)), Some(pa(0x0010_0ABC)));
}

#[test]
fn lookup_of_unmapped_page_is_zero() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);
    assert_eq!(vmm.lookup(va(0x1234_5000)), Mapping::default());
    assert_eq!(vmm.virtual_to_physical(va(0x1234_5000)), None);
}

#[test]
fn map_page_skips_occupied_slots() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    vmm.map_page(va(0x0080_0000), pa(0x0020_0000), rw()).expect("first");
    let used = vmm.map_page(va(0x0080_0000), pa(0x0020_1000), rw()).expect("second");
    assert_eq!(used, va(0x0080_1000));
    assert_eq!(vmm.lookup(va(0x0080_0000)).physical, pa(0x0020_0000));
}

#[test]
fn map_page_stops_before_the_self_map() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    vmm.map_page(va(0xFFBF_F000), pa(0x0030_0000), rw()).expect("last page");
    assert_eq!(
        vmm.map_page(va(0xFFBF_F000), pa(0x0030_1000), rw()),
        Err(VmmError::AddressSpaceExhausted)
    );
}

#[test]
fn null_and_misaligned_addresses_are_rejected() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    assert_eq!(vmm.map_page(va(0), pa(0x1000), rw()), Err(VmmError::InvalidAddress));
    assert_eq!(vmm.map_page(va(0x1000), pa(0), rw()), Err(VmmError::InvalidAddress));
    assert_eq!(vmm.map_page(va(0x1001), pa(0x1000), rw()), Err(VmmError::InvalidAddress));
    assert_eq!(vmm.fmap_page(va(0x1000), pa(0x1800), rw()), Err(VmmError::InvalidAddress));
    assert_eq!(vmm.unmap_page(va(0x1004)), Err(VmmError::InvalidAddress));
    assert_eq!(
        vmm.alloc_pages(va(0x2000), 100, rw()),
        Err(VmmError::InvalidAddress)
    );
}

#[test]
fn flags_are_masked_to_defined_bits() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    vmm.set_mapping(va(0x0040_0000), pa(0x000B_8000), rw().with_os_available(0xF))
        .expect("map");
    assert_eq!(vmm.lookup(va(0x0040_0000)).flags.into_bits(), 0x03);
}

#[test]
fn self_map_region_is_protected() {
    let (ram, mut pmm, root) = setup();
    let before = directory_words(&ram, root);
    let free_before = pmm.free_frames();

    {
        let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);
        assert_eq!(
            vmm.set_mapping(va(0xFFC0_0000), pa(0x0010_0000), rw()),
            Err(VmmError::ProtectedRegion)
        );
        assert_eq!(
            vmm.map_page(va(0xFFFF_F000), pa(0x0010_0000), rw()),
            Err(VmmError::ProtectedRegion)
        );
        assert_eq!(
            vmm.fmap_page(va(0xFFFF_F000), pa(0x0010_0000), rw()),
            Err(VmmError::ProtectedRegion)
        );
        assert_eq!(vmm.unmap_page(va(0xFFFF_F000)), Err(VmmError::ProtectedRegion));
        assert_eq!(vmm.unmap_device_page(va(0xFFC0_1000)), Err(VmmError::ProtectedRegion));
        assert_eq!(vmm.alloc_page(va(0xFFD0_0000), rw()), Err(VmmError::ProtectedRegion));
    }

    assert_eq!(directory_words(&ram, root), before);
    assert_eq!(pmm.free_frames(), free_before);
}

#[test]
fn scratch_and_guard_pages_are_protected() {
    let (ram, mut pmm, root) = setup();
    let free_before = pmm.free_frames();

    {
        let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);
        for page in [0xFFBE_E000, 0xFFBE_F000] {
            assert_eq!(vmm.alloc_page(va(page), rw()), Err(VmmError::ProtectedRegion));
            assert_eq!(
                vmm.map_page(va(page), pa(0x0010_0000), rw()),
                Err(VmmError::ProtectedRegion)
            );
            assert_eq!(
                vmm.fmap_page(va(page), pa(0x0010_0000), rw()),
                Err(VmmError::ProtectedRegion)
            );
            assert_eq!(
                vmm.set_mapping(va(page), pa(0x0010_0000), rw()),
                Err(VmmError::ProtectedRegion)
            );
            assert_eq!(vmm.unmap_page(va(page)), Err(VmmError::ProtectedRegion));
            assert_eq!(vmm.lookup(va(page)), Mapping::default());
        }
        assert_eq!(
            vmm.alloc_pages(va(0xFFBE_D000), 2 * 4096, rw()),
            Err(VmmError::ProtectedRegion)
        );
        assert_eq!(vmm.lookup(va(0xFFBE_D000)), Mapping::default());
    }
    // Only the rollback above touched the allocator, and it gave everything back
    // except the table for slot 1022.
    assert_eq!(pmm.free_frames(), free_before - 1);

    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);
    vmm.set_mapping(va(0xFFBE_D000), pa(0x0030_0000), rw()).expect("below scratch");
    let used = vmm.map_page(va(0xFFBE_D000), pa(0x0030_1000), rw()).expect("map");
    assert_eq!(used, va(0xFFBF_0000));
    assert_eq!(vmm.lookup(va(0xFFBE_E000)), Mapping::default());
    assert_eq!(vmm.lookup(va(0xFFBE_F000)), Mapping::default());
}

#[test]
fn non_present_entries_still_own_their_frame() {
    let (ram, mut pmm, root) = setup();
    let hidden = PageEntryBits::new().with_writable(true);
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    // Table for slot 4 first, so frame counts below only move by data frames.
    vmm.map_page(va(0x0100_0000), pa(0x0030_0000), rw()).expect("table");
    let free_before = vmm.frames().free_frames();

    let used = vmm.alloc_page(va(0x0100_1000), hidden).expect("alloc");
    let frame = vmm.lookup(used).frame;
    assert!(!vmm.lookup(used).is_present());
    assert_eq!(vmm.virtual_to_physical(used), None);
    assert_eq!(vmm.frames().free_frames(), free_before - 1);

    vmm.unmap_page(used).expect("unmap");
    assert!(vmm.frames().is_frame_free(frame));
    assert_eq!(vmm.frames().free_frames(), free_before);

    // A forced remap releases a hidden frame too.
    let used = vmm.alloc_page(va(0x0100_1000), hidden).expect("alloc");
    let old = vmm.lookup(used).frame;
    let new = vmm.frames().allocate_frame().expect("frame");
    vmm.fmap_page(used, new.base(), rw()).expect("fmap");
    assert!(vmm.frames().is_frame_free(old));
    vmm.unmap_page(used).expect("unmap");
    assert_eq!(vmm.frames().free_frames(), free_before);

    // Rolled back ranges give hidden frames back as well.
    vmm.set_mapping(va(0x0100_3000), pa(0x0030_1000), rw()).expect("blocker");
    assert_eq!(
        vmm.alloc_pages(va(0x0100_1000), 3 * 4096, hidden),
        Err(VmmError::MappingConflict)
    );
    assert_eq!(vmm.frames().free_frames(), free_before);
    assert_eq!(vmm.lookup(va(0x0100_1000)), Mapping::default());

    // An existing hidden mapping of the same frame is not a conflict.
    vmm.set_mapping(va(0x0100_5000), pa(0x0030_2000), hidden).expect("hidden");
    vmm.set_mapping(va(0x0100_5000), pa(0x0030_2000), rw()).expect("same frame");
    assert_eq!(
        vmm.set_mapping(va(0x0100_5000), pa(0x0030_3000), rw()),
        Err(VmmError::MappingConflict)
    );
}

#[test]
fn set_mapping_is_idempotent_but_refuses_conflicts() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    vmm.set_mapping(va(0), pa(0), rw()).expect("identity frame 0");
    vmm.set_mapping(va(0x5000), pa(0x5000), rw()).expect("identity");
    vmm.set_mapping(va(0x5000), pa(0x5000), rw()).expect("again");
    assert_eq!(
        vmm.set_mapping(va(0x5000), pa(0x6000), rw()),
        Err(VmmError::MappingConflict)
    );
    assert_eq!(vmm.lookup(va(0x5000)).physical, pa(0x5000));
}

#[test]
fn unmap_releases_the_frame() {
    let (ram, mut pmm, root) = setup();
    let free_before = pmm.free_frames();
    {
        let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);
        let used = vmm.alloc_page(va(0x0100_0000), rw()).expect("alloc");
        let frame = vmm.lookup(used).frame;
        assert!(!vmm.frames().is_frame_free(frame));

        vmm.unmap_page(used).expect("unmap");
        assert!(vmm.frames().is_frame_free(frame));
        assert_eq!(vmm.lookup(used), Mapping::default());

        // Unmapping again is harmless.
        vmm.unmap_page(used).expect("unmap again");
    }
    // One frame stays in use for the new page table.
    assert_eq!(pmm.free_frames(), free_before - 1);
}

#[test]
fn device_unmap_keeps_the_frame() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    let used = vmm.alloc_page(va(0x0100_0000), rw()).expect("alloc");
    let frame = vmm.lookup(used).frame;
    vmm.unmap_device_page(used).expect("unmap");
    assert!(!vmm.frames().is_frame_free(frame));
    assert!(!vmm.lookup(used).is_present());
}

#[test]
fn forced_mapping_releases_the_displaced_frame() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    let used = vmm.alloc_page(va(0x0200_0000), rw()).expect("alloc");
    let old = vmm.lookup(used).frame;
    let new = vmm.frames().allocate_frame().expect("frame");

    assert_eq!(vmm.fmap_page(used, new.base(), rw()), Ok(used));
    assert!(vmm.frames().is_frame_free(old));
    assert!(!vmm.frames().is_frame_free(new.frame_number()));
    assert_eq!(vmm.lookup(used).frame, new.frame_number());

    // Remapping the same frame does not release it.
    assert_eq!(vmm.fmap_page(used, new.base(), rw()), Ok(used));
    assert!(!vmm.frames().is_frame_free(new.frame_number()));
}

#[test]
fn alloc_page_releases_its_frame_on_failure() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    vmm.map_page(va(0xFFBF_F000), pa(0x0030_0000), rw()).expect("last page");
    let free_before = vmm.frames().free_frames();
    assert_eq!(
        vmm.alloc_page(va(0xFFBF_F000), rw()),
        Err(VmmError::AddressSpaceExhausted)
    );
    assert_eq!(vmm.frames().free_frames(), free_before);
}

#[test]
fn alloc_pages_maps_the_whole_range() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    // Crosses from directory slot 3 into slot 4.
    vmm.alloc_pages(va(0x00FF_E000), 4 * 4096, rw()).expect("alloc");
    let frames: Vec<u32> = (0..4)
        .map(|i| vmm.lookup(va(0x00FF_E000 + i * 4096)).frame)
        .collect();
    assert!(frames.iter().all(|&f| f != 0));
    for (i, f) in frames.iter().enumerate() {
        assert!(!frames[i + 1..].contains(f));
    }
    assert!(vmm.tables().table(DirectoryIndex::new(4)).is_some());
}

#[test]
fn alloc_pages_is_all_or_nothing() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    // Make sure the table already exists, then leave exactly two frames.
    vmm.map_page(va(0x0300_0000), pa(0x0030_0000), rw()).expect("table");
    while vmm.frames().free_frames() > 2 {
        vmm.frames().allocate_frame().expect("drain");
    }
    let spare: Vec<u32> = (1..FRAMES).filter(|&f| vmm.frames().is_frame_free(f)).collect();
    assert_eq!(spare.len(), 2);

    assert_eq!(
        vmm.alloc_pages(va(0x0300_1000), 3 * 4096, rw()),
        Err(VmmError::OutOfPhysicalMemory)
    );
    for i in 0..3 {
        assert_eq!(vmm.lookup(va(0x0300_1000 + i * 4096)), Mapping::default());
    }
    for f in &spare {
        assert!(vmm.frames().is_frame_free(*f));
    }
    assert!(vmm.frames().allocate_frame().is_ok());
    assert!(vmm.frames().allocate_frame().is_ok());
}

#[test]
fn alloc_pages_rolls_back_on_conflict() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    vmm.set_mapping(va(0x0400_2000), pa(0x0030_0000), rw()).expect("blocker");
    let free_before = vmm.frames().free_frames();

    assert_eq!(
        vmm.alloc_pages(va(0x0400_0000), 4 * 4096, rw()),
        Err(VmmError::MappingConflict)
    );
    assert_eq!(vmm.frames().free_frames(), free_before);
    assert!(!vmm.lookup(va(0x0400_0000)).is_present());
    assert!(!vmm.lookup(va(0x0400_1000)).is_present());
    assert_eq!(vmm.lookup(va(0x0400_2000)).physical, pa(0x0030_0000));
}

#[test]
fn user_pages_get_user_tables() {
    let (ram, mut pmm, root) = setup();
    let mut vmm = Vmm::new(PhysWindow::new(&ram, root), &mut pmm);

    vmm.alloc_page(va(0x0800_0000), PageEntryBits::new_user_rw()).expect("user page");
    let pde = vmm.tables().directory().get(DirectoryIndex::new(0x20));
    assert!(pde.flags().user_access());
    assert!(pde.flags().writable());
}
