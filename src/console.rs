//! Polled UART output and the `log` backend

use core::fmt::{self, Write};

use log::{Level, Log, Metadata, Record};

use crate::config::log_level;
use crate::hal::{console_flush, console_putchar};

struct Uart;

impl Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        s.bytes().for_each(|b| console_putchar(b as usize));
        console_flush();
        Ok(())
    }
}

/// Takes no lock, so it is safe from trap context and before `start`
pub fn write_fmt(args: fmt::Arguments) {
    // the UART never fails, only a formatting impl could
    let _ = Uart.write_fmt(args);
}

#[macro_export]
macro_rules! println {
    ($($arg: tt)*) => {
        $crate::console::write_fmt(format_args!("{}\n", format_args!($($arg)*)))
    };
}

static LOGGER: Logger = Logger;

/// Install the UART logger; the level comes from `LOG` at build time
///
/// Must run once, before any task or trap can log. RV32I has no atomic
/// read-modify-write, so only the racy setters are available.
pub fn init() {
    // SAFETY: single hart, interrupts still masked, nothing logs yet
    unsafe {
        if log::set_logger_racy(&LOGGER).is_err() {
            return;
        }
        log::set_max_level_racy(log_level());
    }
}

struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let colour = match record.level() {
            Level::Error => 31,
            Level::Warn => 93,
            Level::Info => 34,
            Level::Debug => 32,
            Level::Trace => 90,
        };
        println!("\x1b[{}m{:<5} {}\x1b[0m", colour, record.level(), record.args());
    }

    fn flush(&self) {
        console_flush();
    }
}
