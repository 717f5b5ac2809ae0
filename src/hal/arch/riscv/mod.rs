//! # RV32 board support
//!
//! ## Overview
//! The FPGA soft core runs everything in machine mode. The counter, the
//! compare register and the UART are memory mapped at the addresses in
//! `hal::platform`; interrupt enables are plain CSR bits.
//!
//! ## Safety
//! - MMIO addresses are fixed by the hardware; every access is volatile

pub mod boot;
pub mod trap;
pub mod uart;

use core::ptr::{read_volatile, write_volatile};

use riscv::register::{mie, mstatus};

use crate::hal::platform::{MTIMECMP_HI, MTIMECMP_LO, MTIME_HI, MTIME_LO};
use crate::hal::{ClockRegs, IntrGate};

/// The hart itself; carries no state, every register lives in hardware
#[derive(Debug, Default, Clone, Copy)]
pub struct Board;

impl ClockRegs for Board {
    fn mtime_lo(&self) -> u32 {
        unsafe { read_volatile(MTIME_LO as *const u32) }
    }

    fn mtime_hi(&self) -> u32 {
        unsafe { read_volatile(MTIME_HI as *const u32) }
    }

    fn set_mtimecmp_lo(&mut self, value: u32) {
        unsafe { write_volatile(MTIMECMP_LO as *mut u32, value) }
    }

    fn set_mtimecmp_hi(&mut self, value: u32) {
        unsafe { write_volatile(MTIMECMP_HI as *mut u32, value) }
    }
}

impl IntrGate for Board {
    fn disable_interrupts(&mut self) {
        unsafe { mstatus::clear_mie() }
    }

    fn enable_interrupts(&mut self) {
        unsafe { mstatus::set_mie() }
    }

    fn enable_timer_interrupt(&mut self) {
        unsafe { mie::set_mtimer() }
    }
}

pub fn machine_init() {
    trap::init();
    log::info!("[kernel] RV32 machine init completed");
}

/// Mask everything and park the hart
pub fn halt() -> ! {
    unsafe { mstatus::clear_mie() }
    loop {
        core::hint::spin_loop();
    }
}

/// First thing `rust_main` runs, before any static is touched
pub fn bootstrap_init() {
    boot::clear_bss();
}
