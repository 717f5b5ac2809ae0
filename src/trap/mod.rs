//! # Trap dispatcher
//!
//! ## Overview
//! Every exception and interrupt enters through one routine
//! (`hal/arch/riscv/trap/trap.S`). It stores the interrupted task's registers
//! as a `TrapFrame` on that task's own stack, hands the frame address and
//! `mcause` to `Kernel::dispatch_at`, and restores whatever frame address
//! comes back. Everything between the save and the restore is ordinary Rust
//! in this module.
//!
//! ## Behavior
//! - Voluntary yield (`ecall`): the saved PC is moved past the 4-byte
//!   instruction, otherwise it would trap again forever; then a scheduling
//!   decision is taken according to the `YieldRequest` in `a7`
//! - Timer interrupt: the compare register is rearmed before anything else,
//!   the tick counter advances, then a scheduling decision is taken; no PC
//!   adjustment, the interrupted instruction was not executed
//! - Anything else is a `KernelFault`
//!
//! ## Assumptions
//! - Runs with the global interrupt bit clear (the hart clears it on entry),
//!   which is the only lock the kernel state needs here

pub mod cause;

use num_enum::TryFromPrimitive;

use crate::error::KernelFault;
use crate::hal::Machine;
use crate::task::{Kernel, StackPtr, TaskHandle};
use crate::timer;

pub use cause::{Exception, Interrupt, TrapCause, INTERRUPT_FLAG};

/// Width of the `ecall` instruction
pub const YIELD_INSN_LEN: usize = 4;

/// Why a task takes the yield trap, passed in `a7`
///
/// The decision is taken when the trap arrives, not when the task asked for
/// it: a tick may already have switched away in between, in which case a
/// `Block` or `Preempt` request has nothing left to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(usize)]
pub enum YieldRequest {
    /// give the CPU to an equal or more urgent ready task
    Yield = 0,
    /// the caller blocked itself; switch unless it is running again
    Block = 1,
    /// a more urgent task became ready; switch only if one still is
    Preempt = 2,
}

impl YieldRequest {
    /// Unknown codes are treated as a plain yield
    pub fn decode(bits: usize) -> Self {
        Self::try_from(bits).unwrap_or(Self::Yield)
    }
}

impl<M: Machine> Kernel<M> {
    /// Address form of `dispatch`, as seen by the trap entry routine
    pub fn dispatch_at(&mut self, cause: usize, frame_addr: usize) -> Result<usize, KernelFault> {
        let sp = self
            .stacks
            .ptr_at(frame_addr)
            .ok_or(KernelFault::StrayStackPointer { addr: frame_addr })?;
        let next = self.dispatch(cause, sp)?;
        Ok(self.stacks.addr_of(next))
    }

    /// Handle one trap taken by the current task
    ///
    /// ## Parameters
    /// - `cause`: raw `mcause`
    /// - `sp`: where the entry routine saved the current task's frame
    ///
    /// ## Returns
    /// - the frame to restore, the same `sp` when no switch happened
    pub fn dispatch(&mut self, cause: usize, sp: StackPtr) -> Result<StackPtr, KernelFault> {
        let current = self.current.ok_or(KernelFault::NotStarted)?;
        self.save_frame_position(current, sp)?;

        match TrapCause::decode(cause) {
            TrapCause::Exception(Exception::MachineEnvCall) => {
                let frame = self.stacks.frame_mut(sp);
                frame.mepc = frame.mepc.wrapping_add(YIELD_INSN_LEN);
                let request = YieldRequest::decode(frame.a[7]);
                if self.yield_due(current, request) {
                    self.switch()
                } else {
                    Ok(sp)
                }
            }
            TrapCause::Interrupt(Interrupt::MachineTimer) => {
                self.rearm_tick();
                self.ticks = self.ticks.wrapping_add(1);
                if let Some(hook) = self.config.tick_hook {
                    hook();
                }
                self.reschedule(sp)
            }
            other => {
                log::error!("[kernel] unhandled trap {:?}", other);
                Err(KernelFault::UnrecognizedTrap { cause })
            }
        }
    }

    /// Record `sp` in the current task after checking it lies in its stack
    fn save_frame_position(&mut self, task: TaskHandle, sp: StackPtr) -> Result<(), KernelFault> {
        let stack = self.tcb(task).stack;
        if sp < stack.floor() {
            return Err(KernelFault::StackOverflow { task });
        }
        if !stack.holds_frame(sp) {
            return Err(KernelFault::StrayStackPointer {
                addr: self.stacks.addr_of(sp),
            });
        }
        self.tcb_mut(task).sp = sp;
        Ok(())
    }

    /// Move the compare register to the next tick
    fn rearm_tick(&mut self) {
        let now = timer::read_time(&self.machine);
        self.deadline = timer::next_deadline(self.deadline, now, self.config.tick_period);
        timer::rearm(&mut self.machine, self.deadline);
    }

    fn yield_due(&self, current: TaskHandle, request: YieldRequest) -> bool {
        let tcb = self.tcb(current);
        match request {
            YieldRequest::Yield => self.switch_due(),
            YieldRequest::Block => !tcb.is_running(),
            YieldRequest::Preempt => {
                !tcb.is_running() || matches!(self.ready.highest_priority(), Some(p) if p > tcb.priority)
            }
        }
    }

    fn reschedule(&mut self, sp: StackPtr) -> Result<StackPtr, KernelFault> {
        if self.switch_due() {
            self.switch()
        } else {
            Ok(sp)
        }
    }
}
