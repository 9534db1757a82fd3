//! # Typed 32-bit `x86` Control Registers
//!
//! Bitfield models of the control registers touched while enabling paging,
//! plus the single TLB maintenance instruction the memory manager needs.
//!
//! Register access is only compiled for `x86` targets with the `asm` feature.
//! On any other target the types remain available as plain values so page
//! table code can be unit tested on the host.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "cr0")]
pub mod cr0;

#[cfg(feature = "cr3")]
pub mod cr3;

#[cfg(feature = "tlb")]
pub mod tlb;

pub trait LoadRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// Control register access is privileged and requires ring 0.
    unsafe fn load_unsafe() -> Self;
}

pub trait StoreRegisterUnsafe {
    /// # Safety
    /// The caller must uphold the implementation-specific safety requirements.
    /// Writing a control register changes how every following memory access
    /// is translated.
    unsafe fn store_unsafe(self);
}
