//! # Bitmap Physical Frame Allocator
//!
//! One bit per 4 KiB frame, indexed by frame number, most significant bit
//! first inside each byte (`0x80 >> (frame % 8)`):
//!
//! ```text
//! byte 0:  f0 f1 f2 f3 f4 f5 f6 f7
//! byte 1:  f8 f9 ...
//! ```
//!
//! A set bit means occupied, reserved or unknown; a clear bit means free.
//! [`init`](BitmapFrameAlloc::init) starts with everything occupied, and the
//! boot code frees exactly what the firmware memory map reports as usable.
//!
//! Allocation is next-fit: the scan resumes after the last frame handed out,
//! covering `[cursor, max_frame)` and then `[1, cursor)`. Fully occupied bytes
//! are skipped whole. Frame 0 is never handed out, so a null physical address
//! never names a valid allocation.

use kernel_memory_addresses::{PhysicalAddress, PhysicalPage, Size4K};
use kernel_vmem::FrameAlloc;
use log::{trace, warn};

/// Bitmap size that covers the full 4 GiB physical address space.
pub const DEFAULT_BITMAP_BYTES: usize = 131_072;

/// Frame 0 is never allocatable.
const FIRST_ALLOCATABLE: u32 = 1;

const FRAME_SHIFT: u32 = 12;

#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FrameAllocError {
    #[error("out of physical memory")]
    OutOfPhysicalMemory,
    #[error("frame 0 is never allocated")]
    NullFrame,
    #[error("frame {0} is beyond the managed range")]
    OutOfRange(u32),
    #[error("frame {0} is not allocated")]
    NotAllocated(u32),
}

/// Physical frame allocator over a fixed-size bitmap of `BYTES` bytes.
pub struct BitmapFrameAlloc<const BYTES: usize = DEFAULT_BITMAP_BYTES> {
    bitmap: [u8; BYTES],
    /// Number of frames managed; frames `>= max_frame` are never touched.
    max_frame: u32,
    /// Where the next allocation scan starts.
    cursor: u32,
}

impl<const BYTES: usize> Default for BitmapFrameAlloc<BYTES> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const BYTES: usize> BitmapFrameAlloc<BYTES> {
    /// Number of frames the bitmap can describe.
    #[allow(clippy::cast_possible_truncation)]
    pub const CAPACITY: u32 = (BYTES * 8) as u32;

    /// An allocator managing no frames. Call [`init`](Self::init) before use.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bitmap: [0xFF; BYTES],
            max_frame: 0,
            cursor: FIRST_ALLOCATABLE,
        }
    }

    /// Manage every frame below `upper_limit` (bytes, rounded down to a frame)
    /// and mark all of them occupied.
    ///
    /// Limits beyond the bitmap capacity are clamped.
    pub fn init(&mut self, upper_limit: u64) {
        let frames = upper_limit >> FRAME_SHIFT;
        self.max_frame = if frames > u64::from(Self::CAPACITY) {
            warn!(
                "Physical memory limit {upper_limit:#x} exceeds the frame bitmap; managing {} frames",
                Self::CAPACITY
            );
            Self::CAPACITY
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let frames = frames as u32;
            frames
        };
        self.bitmap.fill(0xFF);
        self.cursor = FIRST_ALLOCATABLE;
    }

    /// Number of frames under management.
    #[inline]
    #[must_use]
    pub const fn max_frame(&self) -> u32 {
        self.max_frame
    }

    /// Bytes of physical memory under management.
    #[inline]
    #[must_use]
    pub const fn manageable_size(&self) -> u64 {
        (self.max_frame as u64) << FRAME_SHIFT
    }

    /// Number of frames currently free.
    #[must_use]
    pub fn free_frames(&self) -> u32 {
        let whole = (self.max_frame / 8) as usize;
        let mut free: u32 = self.bitmap[..whole].iter().map(|b| b.count_zeros()).sum();
        for frame in (self.max_frame & !7)..self.max_frame {
            if self.is_frame_free(frame) {
                free += 1;
            }
        }
        free
    }

    /// `true` if `frame` is managed and free.
    #[inline]
    #[must_use]
    pub fn is_frame_free(&self, frame: u32) -> bool {
        if frame >= self.max_frame {
            return false;
        }
        let (byte, mask) = Self::locate(frame);
        self.bitmap[byte] & mask == 0
    }

    /// Mark one frame free. Frames outside the managed range are ignored.
    #[inline]
    pub fn mark_frame_free(&mut self, frame: u32) {
        if frame < self.max_frame {
            let (byte, mask) = Self::locate(frame);
            self.bitmap[byte] &= !mask;
        }
    }

    /// Mark one frame occupied. Frames outside the managed range are ignored.
    #[inline]
    pub fn mark_frame_occupied(&mut self, frame: u32) {
        if frame < self.max_frame {
            let (byte, mask) = Self::locate(frame);
            self.bitmap[byte] |= mask;
        }
    }

    /// Mark `count` frames starting at `start` free.
    ///
    /// Same result as calling [`mark_frame_free`](Self::mark_frame_free) for
    /// each frame, but touches each byte once.
    pub fn mark_range_free(&mut self, start: u32, count: u32) {
        self.mark_range(start, count, false);
    }

    /// Mark `count` frames starting at `start` occupied.
    ///
    /// Same result as calling [`mark_frame_occupied`](Self::mark_frame_occupied)
    /// for each frame, but touches each byte once.
    pub fn mark_range_occupied(&mut self, start: u32, count: u32) {
        self.mark_range(start, count, true);
    }

    fn mark_range(&mut self, start: u32, count: u32, occupied: bool) {
        let end = start.saturating_add(count).min(self.max_frame);
        let mut frame = start;
        // Leading partial byte, whole bytes, trailing partial byte.
        while frame < end {
            let bit = frame % 8;
            let take = (8 - bit).min(end - frame);
            let mask = span_mask(bit, take);
            let byte = &mut self.bitmap[(frame / 8) as usize];
            if occupied {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
            frame += take;
        }
    }

    /// Allocate one frame, next-fit.
    ///
    /// # Errors
    /// [`FrameAllocError::OutOfPhysicalMemory`] if no managed frame is free.
    pub fn allocate_frame(&mut self) -> Result<PhysicalPage<Size4K>, FrameAllocError> {
        let tail = self.scan(self.cursor, self.max_frame);
        let frame = match tail {
            Some(frame) => frame,
            None => self
                .scan(FIRST_ALLOCATABLE, self.cursor.min(self.max_frame))
                .ok_or(FrameAllocError::OutOfPhysicalMemory)?,
        };

        self.mark_frame_occupied(frame);
        self.cursor = frame + 1;
        trace!("Allocated frame {frame:#x}");
        Ok(PhysicalPage::from_frame_number(frame))
    }

    /// Return the frame containing `addr` to the free pool.
    ///
    /// # Errors
    /// - [`FrameAllocError::NullFrame`] for frame 0.
    /// - [`FrameAllocError::OutOfRange`] for frames beyond [`max_frame`](Self::max_frame).
    /// - [`FrameAllocError::NotAllocated`] if the frame is already free; the
    ///   bitmap is left untouched.
    pub fn free_frame(&mut self, addr: PhysicalAddress) -> Result<(), FrameAllocError> {
        let frame = addr.page::<Size4K>().frame_number();
        if frame == 0 {
            return Err(FrameAllocError::NullFrame);
        }
        if frame >= self.max_frame {
            return Err(FrameAllocError::OutOfRange(frame));
        }
        if self.is_frame_free(frame) {
            return Err(FrameAllocError::NotAllocated(frame));
        }
        self.mark_frame_free(frame);
        trace!("Freed frame {frame:#x}");
        Ok(())
    }

    /// First free frame in `[from, to)`.
    fn scan(&self, from: u32, to: u32) -> Option<u32> {
        let mut frame = from.max(FIRST_ALLOCATABLE);
        while frame < to {
            let (byte, mask) = Self::locate(frame);
            let bits = self.bitmap[byte];
            if bits == 0xFF {
                frame = (frame | 7) + 1;
                continue;
            }
            if bits & mask == 0 {
                return Some(frame);
            }
            frame += 1;
        }
        None
    }

    #[inline]
    const fn locate(frame: u32) -> (usize, u8) {
        ((frame / 8) as usize, 0x80 >> (frame % 8))
    }
}

/// `bits` consecutive bits starting at MSB-first position `first`.
#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn span_mask(first: u32, bits: u32) -> u8 {
    let ones = (1u16 << bits) - 1;
    (ones << (8 - first - bits)) as u8
}

impl<const BYTES: usize> FrameAlloc for BitmapFrameAlloc<BYTES> {
    #[inline]
    fn alloc_4k(&mut self) -> Option<PhysicalPage<Size4K>> {
        self.allocate_frame().ok()
    }

    fn free_4k(&mut self, frame: PhysicalPage<Size4K>) {
        if let Err(e) = self.free_frame(frame.base()) {
            warn!("Rejected release of {frame:?}: {e}");
        }
    }
}
