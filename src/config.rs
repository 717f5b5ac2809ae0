//! # Kernel tunables
//!
//! ## Overview
//! Compile-time limits of the kernel. Everything here is sized once at build
//! time: the task pool, the priority levels and the stack arena never grow.
//!
//! ## Invariants
//! - `MAX_PRIORITIES <= 32` (one bitmap word)
//! - `MAX_TASKS < 256` (handles are stored as `u8`)
//! - `MIN_STACK_WORDS` covers one trap frame, the guard words and the
//!   handler's call depth on top of the interrupted task

use log::LevelFilter;

use crate::task::FRAME_WORDS;

/// Tick interrupt rate
pub const TICK_RATE_HZ: u64 = 1000;

/// Number of priority levels, `0` (idle) is the least urgent
pub const MAX_PRIORITIES: usize = 8;

/// Priority of the idle task
pub const IDLE_PRIORITY: u8 = 0;

/// Capacity of the task pool, idle task included
pub const MAX_TASKS: usize = 8;

/// Words reserved for every task stack, in machine words
pub const STACK_ARENA_WORDS: usize = 4096;

/// Words at the low edge of every stack that must keep the fill pattern
pub const STACK_GUARD_WORDS: usize = 4;

/// Smallest stack accepted by `create_task`
pub const MIN_STACK_WORDS: usize = FRAME_WORDS + STACK_GUARD_WORDS + 96;

/// Stack of the idle task
pub const IDLE_STACK_WORDS: usize = MIN_STACK_WORDS;

/// Pattern painted over fresh stacks
pub const STACK_FILL: usize = 0xA5A5_A5A5;

const _: () = assert!(MAX_PRIORITIES <= 32);
const _: () = assert!(MAX_TASKS < 256);
const _: () = assert!((IDLE_PRIORITY as usize) < MAX_PRIORITIES);
const _: () = assert!(MAX_TASKS * MIN_STACK_WORDS <= STACK_ARENA_WORDS);

/// Console log level, named by `LOG` at build time
pub fn log_level() -> LevelFilter {
    parse_log_level(option_env!("LOG"))
}

/// Unset or unknown names turn logging off
fn parse_log_level(name: Option<&str>) -> LevelFilter {
    name.and_then(|name| name.parse().ok()).unwrap_or(LevelFilter::Off)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_names() {
        assert_eq!(parse_log_level(Some("debug")), LevelFilter::Debug);
        assert_eq!(parse_log_level(Some("TRACE")), LevelFilter::Trace);
        assert_eq!(parse_log_level(Some("loud")), LevelFilter::Off);
        assert_eq!(parse_log_level(None), LevelFilter::Off);
    }
}
