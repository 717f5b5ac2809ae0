//! Polled UART transmitter

use core::ptr::{read_volatile, write_volatile};

use crate::hal::platform::{UART_BUSY_MASK, UART_STATUS, UART_TX};

/// Wait for the transmitter, then send one byte
pub fn console_putchar(c: usize) {
    console_flush();
    unsafe { write_volatile(UART_TX as *mut u32, c as u8 as u32) }
}

/// Spin until the transmitter is idle
pub fn console_flush() {
    while unsafe { read_volatile(UART_STATUS as *const u32) } & UART_BUSY_MASK != 0 {
        core::hint::spin_loop();
    }
}
