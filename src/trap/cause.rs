//! Decoding of the machine cause register.
//!
//! The top bit tells an interrupt (asynchronous) from an exception
//! (synchronous), the remaining bits carry the code.

use bit_field::BitField;
use num_enum::TryFromPrimitive;

/// Top bit of `mcause`
pub const INTERRUPT_FLAG: usize = 1 << (usize::BITS - 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(usize)]
pub enum Exception {
    InstructionMisaligned = 0,
    InstructionFault = 1,
    IllegalInstruction = 2,
    Breakpoint = 3,
    LoadMisaligned = 4,
    LoadFault = 5,
    StoreMisaligned = 6,
    StoreFault = 7,
    /// `ecall` from machine mode, the voluntary yield
    MachineEnvCall = 11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(usize)]
pub enum Interrupt {
    MachineSoft = 3,
    MachineTimer = 7,
    MachineExternal = 11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCause {
    Exception(Exception),
    Interrupt(Interrupt),
    Unknown(usize),
}

impl TrapCause {
    pub fn decode(bits: usize) -> Self {
        let msb = usize::BITS as usize - 1;
        let code = bits.get_bits(0..msb);
        if bits.get_bit(msb) {
            Interrupt::try_from(code).map_or(Self::Unknown(bits), Self::Interrupt)
        } else {
            Exception::try_from(code).map_or(Self::Unknown(bits), Self::Exception)
        }
    }

    /// Raw register value for this cause
    pub fn bits(self) -> usize {
        match self {
            Self::Exception(e) => e as usize,
            Self::Interrupt(i) => INTERRUPT_FLAG | i as usize,
            Self::Unknown(bits) => bits,
        }
    }
}
