//! # Trap frame
//!
//! ## Overview
//! The register image saved on a task's own stack by the trap entry routine
//! (`hal/arch/riscv/trap/trap.S`) and restored from it on the way out.
//! A task that has never run carries a frame built by `TrapFrame::initial`,
//! so the restore path is the same for first dispatch and for resume.
//!
//! ## Layout
//! 32 machine words, 128 bytes on RV32 (a multiple of the 16-byte stack
//! alignment):
//!
//! | word    | register                      |
//! |---------|-------------------------------|
//! | 0       | `mepc`                        |
//! | 1       | `mstatus`                     |
//! | 2       | `ra`                          |
//! | 3..=9   | `t0..t6`                      |
//! | 10..=21 | `s0..s11`                     |
//! | 22..=29 | `a0..a7`                      |
//! | 30..=31 | reserved, always zero         |
//!
//! `sp` is implied by the frame address, `zero` is hard-wired, `gp` and `tp`
//! are the same for the whole image and are never switched.
//!
//! ## Invariants
//! - The field order here and the offsets in `trap.S` are one ABI contract
//! - `size_of::<TrapFrame>() == FRAME_WORDS * size_of::<usize>()`

use bitflags::bitflags;

/// Machine words in one trap frame
pub const FRAME_WORDS: usize = 32;

const _: () = assert!(core::mem::size_of::<TrapFrame>() == FRAME_WORDS * core::mem::size_of::<usize>());
const _: () = assert!((FRAME_WORDS * 4) % 16 == 0);

/// Word index of a `TrapFrame` field, the unit `trap.S` offsets are written in
macro_rules! frame_word {
    ($field: ident) => {
        core::mem::offset_of!(TrapFrame, $field) / core::mem::size_of::<usize>()
    };
}

const _: () = assert!(frame_word!(mepc) == 0);
const _: () = assert!(frame_word!(mstatus) == 1);
const _: () = assert!(frame_word!(ra) == 2);
const _: () = assert!(frame_word!(t) == 3);
const _: () = assert!(frame_word!(s) == 10);
const _: () = assert!(frame_word!(a) == 22);
const _: () = assert!(frame_word!(reserved) == 30);

bitflags! {
    /// `mstatus` bits the kernel writes into fresh frames
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mstatus: usize {
        /// global interrupt enable
        const MIE = 1 << 3;
        /// interrupt enable restored by `mret`
        const MPIE = 1 << 7;
        /// previous privilege = machine
        const MPP_MACHINE = 0b11 << 11;
    }
}

/// General purpose registers `x0..x31`, indexed by register number
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeneralRegs {
    pub x: [usize; 32],
}

impl GeneralRegs {
    pub const RA: usize = 1;
    pub const SP: usize = 2;
    pub const A0: usize = 10;
    pub const A7: usize = 17;

    /// register numbers of `t0..t6`
    const T: [usize; 7] = [5, 6, 7, 28, 29, 30, 31];
    /// register numbers of `s0..s11`
    const S: [usize; 12] = [8, 9, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27];
    /// register numbers of `a0..a7`
    const A: [usize; 8] = [10, 11, 12, 13, 14, 15, 16, 17];
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TrapFrame {
    pub mepc: usize,
    pub mstatus: usize,
    pub ra: usize,
    pub t: [usize; 7],
    pub s: [usize; 12],
    pub a: [usize; 8],
    reserved: [usize; 2],
}

impl TrapFrame {
    /// Frame of a task that has not run yet
    ///
    /// ## Behavior
    /// - `mepc` = entry address, `a0` = argument
    /// - `mstatus` makes `mret` enter machine mode with interrupts enabled
    /// - every other register is zero
    pub fn initial(entry: usize, arg: usize) -> Self {
        let mut frame = Self {
            mepc: entry,
            mstatus: (Mstatus::MPIE | Mstatus::MPP_MACHINE).bits(),
            ..Self::default()
        };
        frame.a[0] = arg;
        frame
    }

    /// What the trap entry routine stores for an interrupted hart
    pub fn save(regs: &GeneralRegs, pc: usize, mstatus: usize) -> Self {
        let mut frame = Self {
            mepc: pc,
            mstatus,
            ra: regs.x[GeneralRegs::RA],
            ..Self::default()
        };
        for (slot, reg) in frame.t.iter_mut().zip(GeneralRegs::T) {
            *slot = regs.x[reg];
        }
        for (slot, reg) in frame.s.iter_mut().zip(GeneralRegs::S) {
            *slot = regs.x[reg];
        }
        for (slot, reg) in frame.a.iter_mut().zip(GeneralRegs::A) {
            *slot = regs.x[reg];
        }
        frame
    }

    /// What the exit path loads back; returns `(pc, mstatus)`
    ///
    /// `x0`, `sp`, `gp` and `tp` are left untouched.
    pub fn restore(&self, regs: &mut GeneralRegs) -> (usize, usize) {
        regs.x[GeneralRegs::RA] = self.ra;
        for (slot, reg) in self.t.iter().zip(GeneralRegs::T) {
            regs.x[reg] = *slot;
        }
        for (slot, reg) in self.s.iter().zip(GeneralRegs::S) {
            regs.x[reg] = *slot;
        }
        for (slot, reg) in self.a.iter().zip(GeneralRegs::A) {
            regs.x[reg] = *slot;
        }
        (self.mepc, self.mstatus)
    }
}
