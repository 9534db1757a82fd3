//! # Kernel Memory Allocation and Virtual Memory Management
//!
//! Physical frame allocation and page-granular virtual memory management for
//! the 32-bit kernel. Everything here works on 4 KiB pages; there is no heap.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │            Virtual Memory Manager (VMM)             │
//! │    • map / fmap / set_mapping / unmap / lookup      │
//! │    • on-demand page tables                          │
//! │    • self-map slot protection                       │
//! └───────────┬─────────────────────────┬───────────────┘
//!             │ frames                  │ tables
//! ┌───────────▼─────────────┐ ┌─────────▼───────────────┐
//! │ Physical Frame Allocator│ │ kernel-vmem TableAccess │
//! │  • one bit per frame    │ │  • self-map windows     │
//! │  • next-fit scan        │ │  • scratch page         │
//! └─────────────────────────┘ └─────────────────────────┘
//! ```
//!
//! ### Physical Frame Allocator ([`frame_alloc`])
//!
//! A fixed-size bitmap covering up to 4 GiB. It starts with every frame
//! occupied; the boot code releases the usable regions reported by the
//! firmware and then re-reserves the kernel image.
//!
//! ### Virtual Memory Manager ([`vmm`])
//!
//! Works on whatever address space its [`TableAccess`](kernel_vmem::TableAccess)
//! view reaches. In the running kernel that is the self-map of the active
//! directory; in tests it is a simulated RAM region.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_alloc::frame_alloc::BitmapFrameAlloc;
//! use kernel_vmem::FrameAlloc;
//!
//! let mut pmm = BitmapFrameAlloc::<16>::new();
//! pmm.init(128 * 4096);
//! pmm.mark_range_free(16, 32);
//! let frame = pmm.alloc_4k().expect("free frame");
//! assert_eq!(frame.frame_number(), 16);
//! pmm.free_4k(frame);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

pub mod frame_alloc;
pub mod vmm;

pub use frame_alloc::{BitmapFrameAlloc, FrameAllocError};
pub use vmm::{Mapping, Vmm, VmmError};
