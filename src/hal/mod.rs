//! # Hardware abstraction layer
//!
//! ## Overview
//! The core only needs two things from the hart:
//! - `ClockRegs`: the free-running counter and its compare register, each
//!   exposed as two 32-bit memory-mapped halves
//! - `IntrGate`: the global interrupt-enable bit and the timer source enable
//!
//! `Machine` bundles both. The board implementation lives in `arch::riscv`
//! (behind the `riscv` feature), the host stub used by the tests in
//! `arch::stub`.
//!
//! ## Assumptions
//! - Single hart, one global interrupt-enable bit, no interrupt levels
//! - The compare register is level-triggered: the timer interrupt stays
//!   asserted while `counter >= compare`

pub mod arch;
pub mod platform;

#[cfg(feature = "riscv")]
pub use arch::{bootstrap_init, halt, machine_init, Board};
#[cfg(feature = "riscv")]
pub use arch::{console_flush, console_putchar};

#[cfg(not(feature = "riscv"))]
pub use arch::stub::{StubHart, StubMachine};

pub use platform::CLOCK_FREQ;

/// Memory-mapped clock halves
pub trait ClockRegs {
    fn mtime_lo(&self) -> u32;
    fn mtime_hi(&self) -> u32;
    fn set_mtimecmp_lo(&mut self, value: u32);
    fn set_mtimecmp_hi(&mut self, value: u32);
}

/// Global interrupt gate
pub trait IntrGate {
    /// clear the global interrupt-enable bit
    fn disable_interrupts(&mut self);
    /// set the global interrupt-enable bit
    fn enable_interrupts(&mut self);
    /// unmask the timer source in the interrupt-enable register
    fn enable_timer_interrupt(&mut self);
}

/// Everything the kernel touches on the hart
pub trait Machine: ClockRegs + IntrGate {}

impl<T: ClockRegs + IntrGate> Machine for T {}
