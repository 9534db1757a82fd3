use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// A `static` whose contents can be borrowed mutably exactly once.
///
/// ```
/// use kernel_sync::BootCell;
///
/// static BITMAP: BootCell<[u8; 16]> = BootCell::new([0xFF; 16]);
///
/// let bitmap = BITMAP.take().expect("first take");
/// bitmap[0] = 0;
/// assert!(BITMAP.take().is_none());
/// ```
pub struct BootCell<T> {
    taken: AtomicBool,
    value: UnsafeCell<T>,
}

impl<T> BootCell<T> {
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            taken: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Hand out the contents. Every call after the first returns `None`.
    pub fn take(&'static self) -> Option<&'static mut T> {
        if self
            .taken
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        // SAFETY: the flag flips once, so this is the only reference ever created.
        Some(unsafe { &mut *self.value.get() })
    }

    /// `true` once [`take`](Self::take) has succeeded.
    #[inline]
    #[must_use]
    pub fn is_taken(&self) -> bool {
        self.taken.load(Ordering::Acquire)
    }
}

// Safety: the value is only reachable through the single `take`.
unsafe impl<T: Send> Sync for BootCell<T> {}
