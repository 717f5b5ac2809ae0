//! # Uniprocessor interior mutability
//!
//! ## Overview
//! - `UPSafeCellRaw`: bare `UnsafeCell` wrapper, the caller guarantees
//!   exclusivity; holds the kernel singleton, which is only touched from
//!   trap context or under the critical section
//! - `CriticalSection`: RAII form of the kernel's `enter` / `exit`
//!
//! ## Safety
//! - `unsafe impl Sync` relies on the single hart plus interrupt masking
//! - `UPSafeCellRaw` performs no checks at all

use core::cell::UnsafeCell;

pub struct UPSafeCellRaw<T> {
    inner: UnsafeCell<T>,
}

unsafe impl<T> Sync for UPSafeCellRaw<T> {}

impl<T> UPSafeCellRaw<T> {
    /// ## Safety
    /// - every later access must happen with interrupts masked, either in
    ///   trap context or inside a critical section
    pub const unsafe fn new(value: T) -> Self {
        Self {
            inner: UnsafeCell::new(value),
        }
    }

    #[allow(clippy::mut_from_ref)]
    pub fn get_mut(&self) -> &mut T {
        unsafe { &mut (*self.inner.get()) }
    }
}

/// Interrupts stay masked until the guard is dropped
#[cfg(feature = "riscv")]
pub struct CriticalSection {
    _private: (),
}

#[cfg(feature = "riscv")]
impl CriticalSection {
    pub fn enter() -> Self {
        crate::task::critical_enter();
        Self { _private: () }
    }
}

#[cfg(feature = "riscv")]
impl Drop for CriticalSection {
    fn drop(&mut self) {
        crate::task::critical_exit();
    }
}
