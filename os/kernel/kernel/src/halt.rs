/// Stop this CPU for good: interrupts off, then `hlt` forever.
pub fn halt() -> ! {
    loop {
        #[cfg(all(target_os = "none", any(target_arch = "x86", target_arch = "x86_64")))]
        unsafe {
            core::arch::asm!("cli", "hlt", options(nomem, nostack));
        }
        #[cfg(not(all(target_os = "none", any(target_arch = "x86", target_arch = "x86_64"))))]
        core::hint::spin_loop();
    }
}
