//! # Trap entry glue
//!
//! ## Overview
//! `trap.S` saves the interrupted task's frame on its own stack and calls
//! `trap_handler` with the frame address and `mcause`. The address returned
//! is the frame `trap.S` restores, so a context switch is nothing more than
//! returning another task's frame.
//!
//! ## Safety
//! - `mtvec` must point at `__alltraps` before the first interrupt is unmasked
//! - `start_first_task` must get a frame built by `StackArena::build_initial_frame`

use core::arch::{asm, global_asm};

use riscv::register::mtvec::{self, TrapMode};

use crate::task::{fatal, kernel};
use crate::trap::YieldRequest;

global_asm!(include_str!("trap.S"));

pub fn init() {
    extern "C" {
        fn __alltraps();
    }
    unsafe {
        mtvec::write(__alltraps as usize, TrapMode::Direct);
    }
}

#[no_mangle]
pub extern "C" fn trap_handler(frame: usize, cause: usize) -> usize {
    match kernel().dispatch_at(cause, frame) {
        Ok(next) => next,
        Err(fault) => fatal(fault),
    }
}

/// Restore the frame at `frame` and `mret` into it
pub fn start_first_task(frame: usize) -> ! {
    extern "C" {
        fn __start_first_task(frame: usize) -> !;
    }
    unsafe { __start_first_task(frame) }
}

/// Voluntary yield: an environment call from machine mode, `request` in `a7`
pub fn yield_trap(request: YieldRequest) {
    unsafe { asm!("ecall", in("a7") request as usize) }
}
