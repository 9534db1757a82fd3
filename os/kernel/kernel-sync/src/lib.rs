//! # Kernel synchronization primitives
//!
//! The memory manager runs on a single hardware thread and takes no locks.
//! What remains is handing statically allocated state (the frame bitmap) to
//! exactly one owner during boot, which [`BootCell`] does.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod boot_cell;

pub use boot_cell::BootCell;
