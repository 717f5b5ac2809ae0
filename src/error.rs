//! # Kernel error kinds
//!
//! ## Overview
//! Two families of failure exist in the core:
//! - `CreationError`: returned to the caller of `create_task`, nothing was
//!   allocated when it is returned
//! - `KernelFault`: detected inside trap context where there is no caller to
//!   report to; the only policy is to halt the hart
//!
//! A torn clock read across a rollover of the low half is not an error, the
//! timer driver retries it transparently.

use core::fmt;

use crate::task::TaskHandle;

/// Failure to create a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationError {
    /// every slot of the task pool is taken
    PoolExhausted,
    /// the stack arena cannot fit the requested stack
    StackExhausted,
    /// requested stack cannot hold a trap frame plus the guard words
    StackTooSmall,
    /// priority outside `0..MAX_PRIORITIES`
    InvalidPriority,
}

impl fmt::Display for CreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationError::PoolExhausted => write!(f, "task pool exhausted"),
            CreationError::StackExhausted => write!(f, "stack arena exhausted"),
            CreationError::StackTooSmall => write!(f, "stack too small for a trap frame"),
            CreationError::InvalidPriority => write!(f, "priority out of range"),
        }
    }
}

/// Unrecoverable kernel state, handled by halting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelFault {
    /// guard words of a task stack were overwritten, or its saved stack
    /// pointer fell into them
    StackOverflow { task: TaskHandle },
    /// trap cause that is neither the yield exception nor the tick interrupt
    UnrecognizedTrap { cause: usize },
    /// trap frame outside the interrupted task's stack region
    StrayStackPointer { addr: usize },
    /// trap taken before the scheduler picked a first task
    NotStarted,
    /// the ready set is empty while a switch is required
    NoReadyTask,
}

impl fmt::Display for KernelFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelFault::StackOverflow { task } => {
                write!(f, "stack overflow in task {}", task.index())
            }
            KernelFault::UnrecognizedTrap { cause } => {
                write!(f, "unrecognized trap, mcause = {:#x}", cause)
            }
            KernelFault::StrayStackPointer { addr } => {
                write!(f, "trap frame at {:#x} outside the current task stack", addr)
            }
            KernelFault::NotStarted => write!(f, "trap before the scheduler started"),
            KernelFault::NoReadyTask => write!(f, "no ready task to switch to"),
        }
    }
}
