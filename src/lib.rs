//! # rtcore
//!
//! Preemptive priority scheduler core for a single-hart RV32 machine-mode
//! CPU: task stacks with prebuilt trap frames, a tick timer on the
//! memory-mapped counter, a nesting critical section, a bitmap ready set and
//! a trap dispatcher that switches tasks by returning another task's frame.
//!
//! The portable parts build on any host; the board glue sits behind the
//! `riscv` feature.

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "riscv")]
#[macro_use]
pub mod console;
pub mod config;
pub mod error;
pub mod hal;
#[cfg(feature = "riscv")]
mod lang_items;
pub mod sync;
pub mod task;
pub mod timer;
pub mod trap;

pub use error::{CreationError, KernelFault};
