//! # QEMU Debug Console Output
//!
//! Early, allocation-free diagnostic output for the kernel when it runs under
//! QEMU. Bytes written to I/O port `0xE9` show up on the host when QEMU is
//! started with `-debugcon`:
//!
//! ```bash
//! qemu-system-i386 -kernel kernel.elf -debugcon stdio
//! qemu-system-i386 -kernel kernel.elf -debugcon file:debug.log
//! ```
//!
//! ## Output path
//!
//! ```text
//! log::info!(..) ─► QemuLogger ─► write_record ─► QemuSink ─► out 0xE9
//! qemu_trace!(..) ─────────────────────────────────► QemuSink ─► out 0xE9
//! ```
//!
//! Every record becomes one `"[LEVEL] target: message"` line.
//!
//! ## Features
//!
//! - `enabled` (default): port writes are compiled in. Without it
//!   [`qemu_trace!`] and the logger still type-check but write nothing.
//!
//! Port writes only happen on x86 targets; elsewhere (the host running the
//! unit tests) the sink swallows its input.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kernel_qemu::QemuLogger;
//! use log::{LevelFilter, info};
//!
//! static LOGGER: QemuLogger = QemuLogger::new(LevelFilter::Debug);
//!
//! LOGGER.init().expect("logger installed once");
//! info!("Paging enabled");
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod logger;

pub use logger::{QemuLogger, write_record};

#[cfg(feature = "enabled")]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    /// QEMU's `-debugcon` I/O port on PC targets.
    const QEMU_DEBUG_PORT: u16 = 0xE9;

    /// Write a single byte to the debug console.
    #[allow(clippy::inline_always)]
    #[inline(always)]
    pub fn dbg_putc(c: u8) {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") QEMU_DEBUG_PORT,
                in("al") c,
                options(nomem, nostack, preserves_flags)
            );
        }
        #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
        let _ = (QEMU_DEBUG_PORT, c);
    }

    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline]
        fn write_str(&mut self, s: &str) -> fmt::Result {
            s.bytes().for_each(dbg_putc);
            Ok(())
        }
    }

    #[doc(hidden)]
    #[inline]
    pub fn qemu_write(args: fmt::Arguments) {
        // Best effort; the sink itself never fails.
        let _ = fmt::write(&mut QemuSink, args);
    }
}

#[cfg(not(feature = "enabled"))]
#[doc(hidden)]
pub mod qemu_fmt {
    use core::fmt::{self, Write};

    pub struct QemuSink;

    impl Write for QemuSink {
        #[inline(always)]
        #[allow(clippy::inline_always)]
        fn write_str(&mut self, _: &str) -> fmt::Result {
            Ok(())
        }
    }

    #[doc(hidden)]
    #[inline(always)]
    #[allow(clippy::inline_always)]
    pub fn qemu_write(_: fmt::Arguments) {}
}

/// `format!`-style output straight to the debug console, bypassing `log`.
#[macro_export]
macro_rules! qemu_trace {
    ($($arg:tt)*) => {{
        $crate::qemu_fmt::qemu_write(core::format_args!($($arg)*));
    }};
}
