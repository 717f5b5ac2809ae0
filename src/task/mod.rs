//! # Task management
//!
//! ## Overview
//! - `context`: the register frame saved on a task's stack by every trap
//! - `stack`: the static stack arena, initial frames and overflow guards
//! - `task`: task control blocks and handles
//! - `manager`: the per-priority ready set
//! - `kernel`: the kernel state tying them together
//!
//! On the board the kernel lives in the `KERNEL` static and is reached
//! through the free functions below; they take the critical section around
//! every access so that a tick cannot observe a half-updated ready set.

mod context;
mod kernel;
mod manager;
mod stack;
#[allow(clippy::module_inception)]
mod task;

pub use context::{GeneralRegs, Mstatus, TrapFrame, FRAME_WORDS};
pub use kernel::{Kernel, KernelConfig};
pub use manager::{highest_set_bit, ReadySet};
pub use stack::{StackArena, StackPtr, StackRegion};
pub use task::{TaskControlBlock, TaskEntry, TaskHandle, TaskStatus};

#[cfg(feature = "riscv")]
pub use board::*;

#[cfg(feature = "riscv")]
mod board {
    use super::{Kernel, KernelConfig, TaskEntry, TaskHandle, TaskStatus};
    use crate::error::{CreationError, KernelFault};
    use crate::hal::arch::{start_first_task, yield_trap};
    use crate::hal::{halt, Board, IntrGate};
    use crate::sync::{CriticalSection, UPSafeCellRaw};
    use crate::trap::YieldRequest;

    static KERNEL: UPSafeCellRaw<Kernel<Board>> =
        unsafe { UPSafeCellRaw::new(Kernel::new(Board, KernelConfig::DEFAULT)) };

    /// The kernel singleton
    ///
    /// Callers outside trap context must hold the critical section.
    pub fn kernel() -> &'static mut Kernel<Board> {
        KERNEL.get_mut()
    }

    /// Run `f` on the kernel with interrupts masked
    fn with_kernel<V>(f: impl FnOnce(&mut Kernel<Board>) -> V) -> V {
        let _guard = CriticalSection::enter();
        f(kernel())
    }

    /// Create a task; once the scheduler runs, a task more urgent than the
    /// caller gets the CPU right away
    pub fn create_task(
        name: &'static str,
        entry: TaskEntry,
        arg: usize,
        stack_words: usize,
        priority: u8,
    ) -> Result<TaskHandle, CreationError> {
        let (created, preempt) = with_kernel(|k| {
            let created = k.create_task(name, entry, arg, stack_words, priority);
            let preempt = matches!(created, Ok(task) if k.outranks_current(task));
            (created, preempt)
        });
        if preempt {
            request_yield(YieldRequest::Preempt);
        }
        created
    }

    /// Enter the most urgent task; never returns
    pub fn start_scheduler() -> ! {
        let k = kernel();
        // the first frame's mstatus turns interrupts back on
        k.machine_mut().disable_interrupts();
        match k.start() {
            Ok(sp) => start_first_task(k.stacks().addr_of(sp)),
            Err(err) => {
                log::error!("[kernel] cannot start scheduler: {}", err);
                halt()
            }
        }
    }

    /// Give up the CPU to the next ready task of the same or a higher
    /// priority; returns at once when there is none
    pub fn yield_now() {
        request_yield(YieldRequest::Yield);
    }

    /// The trap can land after a tick already did the switch; the request
    /// tells the dispatcher what is still wanted at that point
    fn request_yield(request: YieldRequest) {
        if kernel().is_started() {
            yield_trap(request);
        }
    }

    /// Stop scheduling `task`; blocking oneself yields immediately
    pub fn block(task: TaskHandle) -> bool {
        let (changed, is_current) = with_kernel(|k| (k.block(task), k.current() == Some(task)));
        if changed && is_current {
            request_yield(YieldRequest::Block);
        }
        changed
    }

    pub fn block_current() {
        if let Some(task) = current_task() {
            block(task);
        }
    }

    /// Make `task` ready again; yields when it outranks the caller
    pub fn unblock(task: TaskHandle) -> bool {
        let (was_blocked, preempt) = with_kernel(|k| {
            let was_blocked = k.task(task).is_some_and(|t| t.task_status == TaskStatus::Blocked);
            (was_blocked, k.unblock(task))
        });
        if preempt {
            request_yield(YieldRequest::Preempt);
        }
        was_blocked
    }

    pub fn current_task() -> Option<TaskHandle> {
        with_kernel(|k| k.current())
    }

    pub fn tick_count() -> u64 {
        with_kernel(|k| k.ticks())
    }

    pub fn stack_high_water_mark(task: TaskHandle) -> Option<usize> {
        with_kernel(|k| k.stack_high_water_mark(task))
    }

    pub fn critical_enter() {
        kernel().critical_enter();
    }

    pub fn critical_exit() {
        kernel().critical_exit();
    }

    /// Report an unrecoverable fault and stop the hart
    pub fn fatal(fault: KernelFault) -> ! {
        log::error!("[kernel] fatal: {}", fault);
        halt()
    }
}
