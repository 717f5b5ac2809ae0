//! # Kernel state
//!
//! ## Overview
//! `Kernel` is the one piece of shared mutable state of the core: the task
//! pool, the stack arena, the ready set, the current task, the tick counter,
//! the next timer deadline and the critical-section depth, together with the
//! machine it drives.
//!
//! The board build keeps a single instance in a static (`task::KERNEL`); the
//! tests own theirs directly. Trap handling (`crate::trap`) and the public
//! task API both operate on it.
//!
//! ## Assumptions
//! - Single hart; every `&mut Kernel` is taken either in trap context or with
//!   interrupts masked
//!
//! ## Invariants
//! - After `start`, exactly one task is `Running` and it is `current`
//! - The running task is never in the ready set
//! - Tasks in the ready set are exactly the `Ready` ones
//! - Blocked tasks are in no queue

use crate::config::{IDLE_PRIORITY, IDLE_STACK_WORDS, MAX_PRIORITIES, MAX_TASKS, MIN_STACK_WORDS};
use crate::error::{CreationError, KernelFault};
use crate::hal::Machine;
use crate::sync::IntrMaskingInfo;
use crate::task::manager::ReadySet;
use crate::task::stack::{StackArena, StackPtr};
use crate::task::task::{TaskControlBlock, TaskEntry, TaskHandle, TaskStatus};
use crate::timer::{self, TICK_PERIOD};

/// Runtime settings of a kernel instance
#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    /// counter cycles between two tick interrupts
    pub tick_period: u64,
    /// called from the tick interrupt, after the counter advanced
    pub tick_hook: Option<fn()>,
    /// called on every pass of the idle loop
    pub idle_hook: Option<fn()>,
}

impl KernelConfig {
    pub const DEFAULT: Self = Self {
        tick_period: TICK_PERIOD,
        tick_hook: None,
        idle_hook: None,
    };
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Body of the idle task; `hook` is the address of the idle hook, or 0
extern "C" fn idle_loop(hook: usize) -> ! {
    // SAFETY: `start` passes either 0 or a `fn()` cast to `usize`
    let hook: Option<fn()> = (hook != 0).then(|| unsafe { core::mem::transmute::<usize, fn()>(hook) });
    loop {
        if let Some(hook) = hook {
            hook();
        }
        core::hint::spin_loop();
    }
}

pub struct Kernel<M: Machine> {
    pub(crate) machine: M,
    pub(crate) config: KernelConfig,
    pub(crate) tasks: [Option<TaskControlBlock>; MAX_TASKS],
    pub(crate) stacks: StackArena,
    pub(crate) ready: ReadySet,
    pub(crate) current: Option<TaskHandle>,
    pub(crate) idle: Option<TaskHandle>,
    pub(crate) ticks: u64,
    pub(crate) deadline: u64,
    pub(crate) critical: IntrMaskingInfo,
}

impl<M: Machine> Kernel<M> {
    pub const fn new(machine: M, config: KernelConfig) -> Self {
        Self {
            machine,
            config,
            tasks: [None; MAX_TASKS],
            stacks: StackArena::new(),
            ready: ReadySet::new(),
            current: None,
            idle: None,
            ticks: 0,
            deadline: 0,
            critical: IntrMaskingInfo::new(),
        }
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    /// Create a task and make it ready
    ///
    /// ## Parameters
    /// - `stack_words`: stack capacity in machine words, at least
    ///   `MIN_STACK_WORDS`
    /// - `priority`: `0..MAX_PRIORITIES`, higher is more urgent
    ///
    /// ## Behavior
    /// - Until `start`, one pool slot and `IDLE_STACK_WORDS` of the arena
    ///   stay reserved for the idle task, so `start` cannot run out
    /// - Every check runs before anything is allocated, so a failed call
    ///   leaves the pool, the arena and the ready set untouched
    pub fn create_task(
        &mut self,
        name: &'static str,
        entry: TaskEntry,
        arg: usize,
        stack_words: usize,
        priority: u8,
    ) -> Result<TaskHandle, CreationError> {
        if priority as usize >= MAX_PRIORITIES {
            return Err(CreationError::InvalidPriority);
        }
        if stack_words < MIN_STACK_WORDS {
            return Err(CreationError::StackTooSmall);
        }
        let (reserved_slots, reserved_words) = match self.idle {
            Some(_) => (0, 0),
            None => (1, IDLE_STACK_WORDS),
        };
        let free_slots = self.tasks.iter().filter(|t| t.is_none()).count();
        if free_slots <= reserved_slots {
            return Err(CreationError::PoolExhausted);
        }
        if stack_words > self.stacks.remaining().saturating_sub(reserved_words) {
            return Err(CreationError::StackExhausted);
        }
        self.spawn(name, entry, arg, stack_words, priority)
    }

    /// Allocate a slot and a stack, build the first frame, enqueue
    fn spawn(
        &mut self,
        name: &'static str,
        entry: TaskEntry,
        arg: usize,
        stack_words: usize,
        priority: u8,
    ) -> Result<TaskHandle, CreationError> {
        let slot = self
            .tasks
            .iter()
            .position(Option::is_none)
            .ok_or(CreationError::PoolExhausted)?;
        let stack = self.stacks.carve(stack_words)?;
        let sp = self.stacks.build_initial_frame(&stack, entry as usize, arg);

        let handle = TaskHandle::new(slot);
        self.tasks[slot] = Some(TaskControlBlock {
            name,
            priority,
            task_status: TaskStatus::Ready,
            sp,
            stack,
        });
        self.ready.enqueue(handle, priority);
        log::debug!("[kernel] created task {} '{}' prio {}", slot, name, priority);
        Ok(handle)
    }

    /// Create the idle task, pick the first task and arm the tick
    ///
    /// ## Returns
    /// - the stack pointer of the first task's frame, to be restored by the
    ///   trap exit path
    ///
    /// The idle task's slot and stack were held back by `create_task`, and
    /// it keeps the ready set non-empty, so neither step can fail in practice.
    pub fn start(&mut self) -> Result<StackPtr, KernelFault> {
        if let Some(current) = self.current {
            return Ok(self.tcb(current).sp);
        }
        if self.idle.is_none() {
            let hook = self.config.idle_hook.map_or(0, |hook| hook as usize);
            match self.spawn("idle", idle_loop, hook, IDLE_STACK_WORDS, IDLE_PRIORITY) {
                Ok(idle) => self.idle = Some(idle),
                Err(err) => log::error!("[kernel] cannot create idle task: {}", err),
            }
        }
        let first = self.ready.dequeue_highest().ok_or(KernelFault::NoReadyTask)?;
        let tcb = self.tcb_mut(first);
        tcb.task_status = TaskStatus::Running;
        let sp = tcb.sp;
        self.current = Some(first);

        let now = timer::read_time(&self.machine);
        self.deadline = now.wrapping_add(self.config.tick_period);
        timer::rearm(&mut self.machine, self.deadline);
        self.machine.enable_timer_interrupt();
        log::info!("[kernel] scheduler started with task {}", first.index());
        Ok(sp)
    }

    pub fn is_started(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<TaskHandle> {
        self.current
    }

    pub fn idle_task(&self) -> Option<TaskHandle> {
        self.idle
    }

    pub fn task(&self, task: TaskHandle) -> Option<&TaskControlBlock> {
        self.tasks.get(task.index())?.as_ref()
    }

    pub fn tasks(&self) -> impl Iterator<Item = (TaskHandle, &TaskControlBlock)> {
        self.tasks
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.as_ref().map(|t| (TaskHandle::new(i), t)))
    }

    pub fn ready_set(&self) -> &ReadySet {
        &self.ready
    }

    pub fn stacks(&self) -> &StackArena {
        &self.stacks
    }

    pub fn stacks_mut(&mut self) -> &mut StackArena {
        &mut self.stacks
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn read_time(&self) -> u64 {
        timer::read_time(&self.machine)
    }

    /// Words of `task`'s stack never written so far
    pub fn stack_high_water_mark(&self, task: TaskHandle) -> Option<usize> {
        let tcb = self.task(task)?;
        Some(self.stacks.high_water_mark(&tcb.stack))
    }

    /// Whether `task` is more urgent than the running task
    pub fn outranks_current(&self, task: TaskHandle) -> bool {
        match (self.task(task), self.current.and_then(|c| self.task(c))) {
            (Some(t), Some(cur)) => t.priority > cur.priority,
            _ => false,
        }
    }

    /// Take `task` out of scheduling
    ///
    /// ## Behavior
    /// - A ready task leaves the ready set
    /// - The running task is only marked; it keeps the CPU until its next
    ///   yield or tick, which then always switches away
    /// - The idle task cannot be blocked
    ///
    /// ## Returns
    /// - whether the task changed state
    pub fn block(&mut self, task: TaskHandle) -> bool {
        if self.idle == Some(task) {
            return false;
        }
        let Some(tcb) = self.tasks.get_mut(task.index()).and_then(Option::as_mut) else {
            return false;
        };
        match tcb.task_status {
            TaskStatus::Ready => {
                let priority = tcb.priority;
                tcb.task_status = TaskStatus::Blocked;
                self.ready.remove(task, priority);
            }
            TaskStatus::Running => tcb.task_status = TaskStatus::Blocked,
            TaskStatus::Blocked => return false,
        }
        log::trace!("[kernel] blocked task {}", task.index());
        true
    }

    /// Make a blocked task ready again, at the tail of its level
    ///
    /// ## Returns
    /// - whether the woken task outranks the running one, i.e. the caller
    ///   should yield
    pub fn unblock(&mut self, task: TaskHandle) -> bool {
        let Some(tcb) = self.tasks.get_mut(task.index()).and_then(Option::as_mut) else {
            return false;
        };
        if tcb.task_status != TaskStatus::Blocked {
            return false;
        }
        tcb.task_status = TaskStatus::Ready;
        let priority = tcb.priority;
        self.ready.enqueue(task, priority);
        log::trace!("[kernel] unblocked task {}", task.index());
        self.outranks_current(task)
    }

    pub fn critical_enter(&mut self) {
        self.critical.enter(&mut self.machine);
    }

    pub fn critical_exit(&mut self) {
        self.critical.exit(&mut self.machine);
    }

    pub fn critical_depth(&self) -> usize {
        self.critical.depth()
    }

    /// Whether the scheduling policy asks for a switch right now
    ///
    /// ## Behavior
    /// - The current task stopped running (blocked): always
    /// - Otherwise: iff some ready task has priority ≥ the current one,
    ///   a more urgent task or an equal-priority peer whose turn it is
    pub(crate) fn switch_due(&self) -> bool {
        let Some(cur) = self.current.and_then(|c| self.task(c)) else {
            return !self.ready.is_empty();
        };
        if !cur.is_running() {
            return true;
        }
        matches!(self.ready.highest_priority(), Some(p) if p >= cur.priority)
    }

    /// Hand the CPU to the most urgent ready task
    ///
    /// ## Behavior
    /// - Checks the outgoing task's stack first
    /// - A still-running outgoing task goes back to the tail of its level
    ///   before the next one is chosen (round robin among equals)
    pub(crate) fn switch(&mut self) -> Result<StackPtr, KernelFault> {
        let prev = self.current.ok_or(KernelFault::NotStarted)?;
        self.check_stack(prev)?;

        let tcb = self.tcb_mut(prev);
        if tcb.is_running() {
            tcb.task_status = TaskStatus::Ready;
            let priority = tcb.priority;
            self.ready.enqueue(prev, priority);
        }
        let next = self.ready.dequeue_highest().ok_or(KernelFault::NoReadyTask)?;
        let tcb = self.tcb_mut(next);
        tcb.task_status = TaskStatus::Running;
        let sp = tcb.sp;
        self.current = Some(next);
        log::trace!("[kernel] switch {} -> {}", prev.index(), next.index());
        Ok(sp)
    }

    /// Guard words intact and saved frame above them
    pub(crate) fn check_stack(&self, task: TaskHandle) -> Result<(), KernelFault> {
        let tcb = self.tcb(task);
        if tcb.sp < tcb.stack.floor() || !self.stacks.guard_intact(&tcb.stack) {
            return Err(KernelFault::StackOverflow { task });
        }
        Ok(())
    }

    /// Handles only come from this kernel's pool, so the slot is occupied
    pub(crate) fn tcb(&self, task: TaskHandle) -> &TaskControlBlock {
        self.tasks[task.index()]
            .as_ref()
            .unwrap_or_else(|| unreachable!("dangling task handle {}", task.index()))
    }

    pub(crate) fn tcb_mut(&mut self, task: TaskHandle) -> &mut TaskControlBlock {
        self.tasks[task.index()]
            .as_mut()
            .unwrap_or_else(|| unreachable!("dangling task handle {}", task.index()))
    }
}
