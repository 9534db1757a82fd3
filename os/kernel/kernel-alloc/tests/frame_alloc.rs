use kernel_alloc::frame_alloc::{BitmapFrameAlloc, FrameAllocError};
use kernel_memory_addresses::{PhysicalAddress, PhysicalPage};
use kernel_vmem::FrameAlloc;

const MIB: u64 = 1024 * 1024;

fn small(frames: u32) -> BitmapFrameAlloc<8> {
    let mut pmm = BitmapFrameAlloc::<8>::new();
    pmm.init(u64::from(frames) * 4096);
    pmm
}

fn frame_addr(n: u32) -> PhysicalAddress {
    PhysicalPage::from_frame_number(n).base()
}

#[test]
fn usable_region_after_low_memory() {
    let mut pmm = Box::new(BitmapFrameAlloc::<{ 131_072 }>::new());
    pmm.init(16 * MIB);
    assert_eq!(pmm.max_frame(), 4096);

    pmm.mark_range_free(256, 3840);
    assert_eq!(pmm.free_frames(), 3840);

    let frame = pmm.allocate_frame().expect("frame");
    assert_eq!(frame.base(), PhysicalAddress::new(0x0010_0000));
}

#[test]
fn nothing_is_free_after_init() {
    let mut pmm = small(64);
    assert_eq!(pmm.free_frames(), 0);
    assert_eq!(pmm.allocate_frame(), Err(FrameAllocError::OutOfPhysicalMemory));
}

#[test]
fn frame_zero_is_never_allocated() {
    let mut pmm = small(64);
    pmm.mark_frame_free(0);
    assert!(pmm.is_frame_free(0));
    assert_eq!(pmm.allocate_frame(), Err(FrameAllocError::OutOfPhysicalMemory));
    assert_eq!(pmm.free_frame(PhysicalAddress::zero()), Err(FrameAllocError::NullFrame));
}

#[test]
fn range_marking_matches_single_frames() {
    for (start, count) in [(0, 64), (3, 2), (5, 11), (8, 8), (13, 30), (60, 10), (7, 1)] {
        let mut ranged = small(64);
        let mut single = small(64);
        ranged.mark_range_free(start, count);
        ranged.mark_range_free(start, count);
        for f in start..start + count {
            single.mark_frame_free(f);
        }
        for f in 0..64 {
            assert_eq!(
                ranged.is_frame_free(f),
                single.is_frame_free(f),
                "frame {f} after freeing {count} from {start}"
            );
        }

        ranged.mark_range_occupied(start + 1, count / 2);
        for f in start + 1..start + 1 + count / 2 {
            single.mark_frame_occupied(f);
        }
        for f in 0..64 {
            assert_eq!(ranged.is_frame_free(f), single.is_frame_free(f), "frame {f}");
        }
    }
}

#[test]
fn marking_beyond_the_managed_range_is_ignored() {
    let mut pmm = small(20);
    pmm.mark_range_free(16, 100);
    assert_eq!(pmm.free_frames(), 4);
    assert!(!pmm.is_frame_free(20));
    pmm.mark_frame_free(40);
    assert_eq!(pmm.free_frames(), 4);
}

#[test]
fn allocation_is_next_fit_and_wraps() {
    let mut pmm = small(64);
    pmm.mark_frame_free(5);
    pmm.mark_frame_free(10);

    let a = pmm.allocate_frame().expect("a");
    assert_eq!(a.frame_number(), 5);
    pmm.free_frame(a.base()).expect("free a");

    // The scan continues after frame 5 before wrapping around.
    assert_eq!(pmm.allocate_frame().map(|f| f.frame_number()), Ok(10));
    assert_eq!(pmm.allocate_frame().map(|f| f.frame_number()), Ok(5));
    assert_eq!(pmm.allocate_frame(), Err(FrameAllocError::OutOfPhysicalMemory));
}

#[test]
fn allocated_frames_are_distinct() {
    let mut pmm = small(64);
    pmm.mark_range_free(1, 63);
    let mut seen = Vec::new();
    while let Ok(frame) = pmm.allocate_frame() {
        assert!(!seen.contains(&frame));
        seen.push(frame);
    }
    assert_eq!(seen.len(), 63);
    assert_eq!(pmm.free_frames(), 0);
}

#[test]
fn free_rejects_bad_frames() {
    let mut pmm = small(32);
    pmm.mark_frame_free(3);

    assert_eq!(pmm.free_frame(frame_addr(32)), Err(FrameAllocError::OutOfRange(32)));
    assert_eq!(pmm.free_frame(frame_addr(3)), Err(FrameAllocError::NotAllocated(3)));
    assert!(pmm.is_frame_free(3));

    let frame = pmm.allocate_frame().expect("frame");
    assert_eq!(pmm.free_frame(frame.base()), Ok(()));
    assert_eq!(pmm.free_frame(frame.base()), Err(FrameAllocError::NotAllocated(3)));
}

#[test]
fn free_uses_the_containing_frame() {
    let mut pmm = small(32);
    pmm.mark_frame_free(7);
    let frame = pmm.allocate_frame().expect("frame");
    pmm.free_frame(PhysicalAddress::new(frame.base().as_u32() + 0x123)).expect("free");
    assert!(pmm.is_frame_free(7));
}

#[test]
fn limit_is_clamped_to_capacity() {
    let mut pmm = BitmapFrameAlloc::<4>::new();
    pmm.init(4 * 1024 * MIB);
    assert_eq!(pmm.max_frame(), BitmapFrameAlloc::<4>::CAPACITY);
    assert_eq!(pmm.max_frame(), 32);
}

#[test]
fn trait_free_of_a_free_frame_leaves_state_alone() {
    let mut pmm = small(32);
    pmm.mark_frame_free(9);
    let frame = pmm.alloc_4k().expect("frame");
    pmm.free_4k(frame);
    pmm.free_4k(frame);
    assert_eq!(pmm.free_frames(), 1);
}
