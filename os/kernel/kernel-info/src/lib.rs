//! # Kernel Configuration and Boot Interface
//!
//! This crate defines the memory layout constants and the boot interface
//! contracts that govern the kernel's early memory bring-up. It is the single
//! source of truth for addresses shared by the bootstrap page builder, the
//! virtual memory manager and the boot sequencer.
//!
//! ## Architecture
//!
//! ### Boot Information ([`boot`])
//! Defines the bootloader-to-kernel handoff:
//! * **Memory size**: lower/upper memory as reported by the firmware
//! * **Memory map**: usable and reserved physical ranges
//! * **Kernel image**: link-time extent of the kernel and of the low-linked loader stub
//!
//! ### Memory Layout ([`memory`])
//! Establishes the kernel's 32-bit virtual memory architecture.
//!
//! ## Virtual Memory Architecture
//!
//! ```text
//! Virtual Address Space Layout (32-bit, two-level paging):
//!
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │  Identity-mapped first 1 MiB    │
//! 0x0010_0000 ├─────────────────────────────────┤
//!             │  Loader identity (until release)│
//!             ├─────────────────────────────────┤
//!             │         User Space              │
//! VGA_BUFFER_VADDR ├────────────────────────────┤ 0xB000_0000
//!             │  VGA text buffer                │
//! HIGHER_HALF_BASE ├────────────────────────────┤ 0xC000_0000
//!             │  Kernel image (3 tables, 12 MiB)│
//!             ├─────────────────────────────────┤
//! SCRATCH_PAGE├─────────────────────────────────┤ 0xFFBE_E000
//! STACK_GUARD_PAGE ├────────────────────────────┤ 0xFFBE_F000
//!             │  (never mapped)                 │
//! KERNEL_STACK_START ├──────────────────────────┤ 0xFFBF_0000
//!             │  Kernel stack (64 KiB)          │
//! TABLE_WINDOW_BASE ├───────────────────────────┤ 0xFFC0_0000
//!             │  Self-map: tables 0..=1022      │
//! DIRECTORY_WINDOW ├────────────────────────────┤ 0xFFFF_F000
//!             │  Self-map: the directory        │
//! 0xFFFF_FFFF └─────────────────────────────────┘
//! ```
//!
//! ## Physical Memory Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1MiB)         │
//!             │  (BIOS, VGA, real-mode data)    │
//! PHYS_LOAD   ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!             │  Loader stub, kernel image      │
//!             ├─────────────────────────────────┤
//!             │    Available RAM                │
//!             │  (Managed by the frame bitmap)  │
//!             └─────────────────────────────────┘
//! ```
//!
//! All layout constants are `const` values checked at compile time.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod memory;
