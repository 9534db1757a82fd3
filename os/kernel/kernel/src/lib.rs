//! # Kernel Memory Bring-Up
//!
//! Boot sequencing for the 32-bit higher-half kernel:
//!
//! 1. [`bootstrap`]: the loader stub builds the first page directory and turns
//!    paging on.
//! 2. [`init`]: the kernel, now running in the higher half, seeds the frame
//!    allocator from the firmware memory map and maps the VGA buffer and its
//!    own stack.
//! 3. [`memory`]: post-init housekeeping such as identity-mapping reserved
//!    firmware ranges and dropping the loader identity mapping.
//!
//! Every step reports failure through a typed error. Only the entry point
//! halts.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod bootstrap;
pub mod halt;
pub mod init;
pub mod memory;
pub mod tracing;

#[cfg(target_os = "none")]
mod entry;

pub use init::{InitError, init_memory, setup_physical_memory};
