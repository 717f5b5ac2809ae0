#[cfg(feature = "riscv")]
pub mod riscv;

#[cfg(feature = "riscv")]
pub use self::riscv::{
    bootstrap_init,
    halt,
    machine_init,
    trap::{start_first_task, trap_handler, yield_trap},
    uart::{console_flush, console_putchar},
    Board,
};

#[cfg(not(feature = "riscv"))]
pub mod stub;
