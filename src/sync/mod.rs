//! # Kernel synchronization
//!
//! ## Overview
//! - `critical`: nesting-safe global interrupt mask kept in the kernel state
//! - `up`: `UPSafeCellRaw` holds the kernel singleton, `CriticalSection` is
//!   the scoped form of the mask
//!
//! ## Assumptions
//! - Single hart; the only concurrency is trap-driven preemption
//! - Trap handlers run with the global interrupt bit clear, so kernel state
//!   touched only from traps needs no further locking
//!
//! Queues, semaphores and mutexes are built outside the core on top of
//! `task::block` / `task::unblock` and the critical section.

mod critical;
mod up;

pub use critical::IntrMaskingInfo;

pub use up::UPSafeCellRaw;
#[cfg(feature = "riscv")]
pub use up::CriticalSection;
