//! # Tick timer driver
//!
//! ## Overview
//! The hardware clock is a free-running 64-bit counter and a 64-bit compare
//! register, both exposed as two 32-bit memory-mapped halves. The compare is
//! level-triggered: the timer interrupt is asserted whenever
//! `counter >= compare` and stays asserted until the compare is moved past
//! the counter.
//!
//! ## Invariants
//! - `read_time` never returns a value torn across a carry from the low
//!   half into the high half
//! - `rearm` never lets `counter >= compare` become transiently true while
//!   the two halves are being written

use bit_field::BitField;

use crate::config::TICK_RATE_HZ;
use crate::hal::{ClockRegs, CLOCK_FREQ};

pub const MSEC_PER_SEC: u64 = 1000;

/// Counter cycles between two ticks on the board
pub const TICK_PERIOD: u64 = CLOCK_FREQ / TICK_RATE_HZ;

/// Read the 64-bit counter
///
/// ## Behavior
/// - Reads high, low, high; retries while the two high reads differ
pub fn read_time<R: ClockRegs + ?Sized>(regs: &R) -> u64 {
    loop {
        let hi = regs.mtime_hi();
        let lo = regs.mtime_lo();
        if regs.mtime_hi() == hi {
            return ((hi as u64) << 32) | lo as u64;
        }
    }
}

/// Program the compare register with `deadline`
///
/// ## Behavior
/// - Parks the high half at `u32::MAX` first so that no intermediate value
///   of the pair can match the counter, then writes low, then high
pub fn rearm<R: ClockRegs + ?Sized>(regs: &mut R, deadline: u64) {
    regs.set_mtimecmp_hi(u32::MAX);
    regs.set_mtimecmp_lo(deadline.get_bits(0..32) as u32);
    regs.set_mtimecmp_hi(deadline.get_bits(32..64) as u32);
}

/// Deadline following `deadline`, one `period` later
///
/// Stays on the fixed tick grid so ticks do not drift; if the grid point has
/// already passed (ticks were missed) the next deadline is taken from `now`
/// so that the level-triggered compare does not fire back to back.
pub fn next_deadline(deadline: u64, now: u64, period: u64) -> u64 {
    let next = deadline.wrapping_add(period);
    if next <= now {
        now.wrapping_add(period)
    } else {
        next
    }
}

/// Whole ticks covering `ms` milliseconds, rounded up, saturating
pub const fn ms_to_ticks(ms: u64) -> u64 {
    let whole = (ms / MSEC_PER_SEC).saturating_mul(TICK_RATE_HZ);
    let part = (ms % MSEC_PER_SEC * TICK_RATE_HZ).div_ceil(MSEC_PER_SEC);
    whole.saturating_add(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::StubMachine;

    #[test]
    fn read_time_survives_low_half_rollover() {
        let mut clock = StubMachine::new();
        clock.set_time(0x0000_0000_FFFF_FFF0);
        clock.set_step_per_read(3);

        let mut last = 0;
        for _ in 0..64 {
            let now = read_time(&clock);
            assert!(now >= last, "torn read {:#x} after {:#x}", now, last);
            assert!(now <= clock.time());
            last = now;
        }
        assert!(last > 0x1_0000_0000);
    }

    #[test]
    fn rearm_parks_high_half_first() {
        let mut clock = StubMachine::new();
        clock.set_time(0x1_0000_0005);
        clock.force_compare(0x1_0000_0000);

        rearm(&mut clock, 0x1_FFFF_0000);

        let writes = clock.compare_writes();
        assert_eq!(writes[0], (true, u32::MAX));
        assert_eq!(writes[1], (false, 0xFFFF_0000));
        assert_eq!(writes[2], (true, 0x1));
        assert_eq!(clock.compare(), 0x1_FFFF_0000);
        assert_eq!(clock.transient_matches(), 0);
    }

    #[test]
    fn naive_low_first_update_would_match_transiently() {
        let mut clock = StubMachine::new();
        clock.set_time(0x1_0000_0005);
        clock.force_compare(0x0_FFFF_FFFF);

        clock.set_mtimecmp_lo(0x0000_0010);
        clock.set_mtimecmp_hi(0x2);
        assert_eq!(clock.transient_matches(), 1);
    }

    #[test]
    fn next_deadline_stays_on_grid() {
        assert_eq!(next_deadline(1000, 1005, 100), 1100);
        assert_eq!(next_deadline(1000, 1350, 100), 1450);
    }

    #[test]
    fn ms_to_ticks_rounds_up() {
        assert_eq!(ms_to_ticks(0), 0);
        assert_eq!(ms_to_ticks(1), 1);
        assert_eq!(ms_to_ticks(250), 250);
        assert_eq!(ms_to_ticks(90_061), 90_061);
    }

    #[test]
    fn ms_to_ticks_does_not_overflow() {
        assert_eq!(ms_to_ticks(u64::MAX / 10), u64::MAX / 10);
        assert_eq!(ms_to_ticks(u64::MAX), u64::MAX);
    }
}
