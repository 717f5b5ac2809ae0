//! Board constants of the FPGA soft core. The addresses are fixed by the
//! CPU's memory map and must match the hardware exactly.

/// Core clock, also the rate of the free-running counter
pub const CLOCK_FREQ: u64 = 25_000_000;

/// Counter low/high halves
pub const MTIME_LO: usize = 0xFFFF_0008;
pub const MTIME_HI: usize = 0xFFFF_000C;

/// Compare low/high halves
pub const MTIMECMP_LO: usize = 0xFFFF_0010;
pub const MTIMECMP_HI: usize = 0xFFFF_0014;

/// UART transmit data and status registers
pub const UART_TX: usize = 0xFFFF_FFF0;
pub const UART_STATUS: usize = 0xFFFF_FFF4;

/// Status bits that read non-zero while the transmitter is busy
pub const UART_BUSY_MASK: u32 = 0x3;
