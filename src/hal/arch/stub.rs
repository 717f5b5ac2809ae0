//! # Host stand-in for the hart
//!
//! ## Overview
//! Lets the portable core run on the build host:
//! - `StubMachine` models the clock halves (with an optional advance per
//!   register read, to provoke a low-half rollover between two reads) and the
//!   interrupt gate, and records what the kernel did to them
//! - `StubHart` plays the part of `trap.S`: it saves its registers into a
//!   `TrapFrame` on the current task's stack, calls `Kernel::dispatch` and
//!   loads the frame it gets back

use core::cell::Cell;

use crate::error::KernelFault;
use crate::hal::{ClockRegs, IntrGate, Machine};
use crate::task::{GeneralRegs, Kernel, StackPtr, TrapFrame, FRAME_WORDS};
use crate::trap::{Exception, Interrupt, YieldRequest, INTERRUPT_FLAG};

const WRITE_LOG: usize = 16;

#[derive(Debug)]
pub struct StubMachine {
    time: Cell<u64>,
    step_per_read: u64,
    compare: u64,
    /// `(high half?, value)` of the first compare writes
    writes: [(bool, u32); WRITE_LOG],
    write_count: usize,
    transient_matches: usize,
    interrupts_enabled: bool,
    enable_count: usize,
    disable_transitions: usize,
    timer_interrupt_enabled: bool,
}

impl Default for StubMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StubMachine {
    pub const fn new() -> Self {
        Self {
            time: Cell::new(0),
            step_per_read: 0,
            compare: u64::MAX,
            writes: [(false, 0); WRITE_LOG],
            write_count: 0,
            transient_matches: 0,
            interrupts_enabled: false,
            enable_count: 0,
            disable_transitions: 0,
            timer_interrupt_enabled: false,
        }
    }

    pub fn time(&self) -> u64 {
        self.time.get()
    }

    pub fn set_time(&mut self, time: u64) {
        self.time.set(time);
    }

    pub fn advance(&mut self, cycles: u64) {
        self.time.set(self.time.get().wrapping_add(cycles));
    }

    /// Let the counter run `step` cycles after every half read
    pub fn set_step_per_read(&mut self, step: u64) {
        self.step_per_read = step;
    }

    /// Set the compare pair without going through the register halves
    pub fn force_compare(&mut self, compare: u64) {
        self.compare = compare;
    }

    pub fn compare(&self) -> u64 {
        self.compare
    }

    /// Level of the timer interrupt line
    pub fn timer_pending(&self) -> bool {
        self.time() >= self.compare
    }

    pub fn compare_writes(&self) -> &[(bool, u32)] {
        &self.writes[..self.write_count]
    }

    pub fn clear_compare_writes(&mut self) {
        self.write_count = 0;
        self.transient_matches = 0;
    }

    /// Compare writes after which the pair already matched the counter
    pub fn transient_matches(&self) -> usize {
        self.transient_matches
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    /// Calls that set the global enable bit
    pub fn enable_count(&self) -> usize {
        self.enable_count
    }

    /// Times the global enable bit went from set to clear
    pub fn disable_transitions(&self) -> usize {
        self.disable_transitions
    }

    pub fn timer_interrupt_enabled(&self) -> bool {
        self.timer_interrupt_enabled
    }

    fn tick_read(&self, value: u32) -> u32 {
        self.time.set(self.time.get().wrapping_add(self.step_per_read));
        value
    }

    fn record_write(&mut self, high: bool, value: u32) {
        if self.write_count < WRITE_LOG {
            self.writes[self.write_count] = (high, value);
            self.write_count += 1;
        }
        if self.timer_pending() {
            self.transient_matches += 1;
        }
    }
}

impl ClockRegs for StubMachine {
    fn mtime_lo(&self) -> u32 {
        self.tick_read(self.time() as u32)
    }

    fn mtime_hi(&self) -> u32 {
        self.tick_read((self.time() >> 32) as u32)
    }

    fn set_mtimecmp_lo(&mut self, value: u32) {
        self.compare = (self.compare & !0xFFFF_FFFF) | value as u64;
        self.record_write(false, value);
    }

    fn set_mtimecmp_hi(&mut self, value: u32) {
        self.compare = (self.compare & 0xFFFF_FFFF) | ((value as u64) << 32);
        self.record_write(true, value);
    }
}

impl IntrGate for StubMachine {
    fn disable_interrupts(&mut self) {
        if self.interrupts_enabled {
            self.disable_transitions += 1;
        }
        self.interrupts_enabled = false;
    }

    fn enable_interrupts(&mut self) {
        self.enable_count += 1;
        self.interrupts_enabled = true;
    }

    fn enable_timer_interrupt(&mut self) {
        self.timer_interrupt_enabled = true;
    }
}

/// Register state of the simulated hart while a task runs
#[derive(Debug, Default, Clone, Copy)]
pub struct StubHart {
    pub regs: GeneralRegs,
    pub pc: usize,
    pub mstatus: usize,
    /// task stack pointer, as a word index into the arena
    pub sp: usize,
}

impl StubHart {
    /// Start the scheduler and enter the first task
    pub fn boot<M: Machine>(kernel: &mut Kernel<M>) -> Result<Self, KernelFault> {
        let sp = kernel.start()?;
        let mut hart = Self::default();
        hart.resume(kernel, sp);
        Ok(hart)
    }

    /// Take a trap with the given raw cause, as `trap.S` would
    pub fn trap<M: Machine>(&mut self, kernel: &mut Kernel<M>, cause: usize) -> Result<(), KernelFault> {
        let frame_sp = StackPtr::from_word(self.sp - FRAME_WORDS);
        *kernel.stacks_mut().frame_mut(frame_sp) = TrapFrame::save(&self.regs, self.pc, self.mstatus);
        let next = kernel.dispatch(cause, frame_sp)?;
        self.resume(kernel, next);
        Ok(())
    }

    pub fn tick<M: Machine>(&mut self, kernel: &mut Kernel<M>) -> Result<(), KernelFault> {
        self.trap(kernel, INTERRUPT_FLAG | Interrupt::MachineTimer as usize)
    }

    pub fn yield_now<M: Machine>(&mut self, kernel: &mut Kernel<M>) -> Result<(), KernelFault> {
        self.request(kernel, YieldRequest::Yield)
    }

    /// `ecall` with `request` loaded into `a7`
    pub fn request<M: Machine>(&mut self, kernel: &mut Kernel<M>, request: YieldRequest) -> Result<(), KernelFault> {
        self.regs.x[GeneralRegs::A7] = request as usize;
        self.trap(kernel, Exception::MachineEnvCall as usize)
    }

    fn resume<M: Machine>(&mut self, kernel: &Kernel<M>, sp: StackPtr) {
        let frame = *kernel.stacks().frame(sp);
        let (pc, mstatus) = frame.restore(&mut self.regs);
        self.pc = pc;
        self.mstatus = mstatus;
        self.sp = sp.word() + FRAME_WORDS;
        self.regs.x[GeneralRegs::SP] = kernel.stacks().addr_of(StackPtr::from_word(self.sp));
    }
}
