mod common;

use core::sync::atomic::{AtomicUsize, Ordering};

use common::{assert_consistent, kernel, spin, status, tick, PERIOD};
use rtcore::config::MIN_STACK_WORDS;
use rtcore::hal::{StubHart, StubMachine};
use rtcore::task::{GeneralRegs, Kernel, KernelConfig, TaskStatus};
use rtcore::trap::YieldRequest;

#[test]
fn idle_alone_survives_many_ticks() {
    let mut k = kernel();
    let mut hart = StubHart::boot(&mut k).unwrap();
    let idle = k.idle_task().unwrap();

    for _ in 0..1000 {
        tick(&mut k, &mut hart);
        assert_eq!(k.current(), Some(idle));
    }
    assert_eq!(k.ticks(), 1000);
    assert_consistent(&k);
}

#[test]
fn single_task_above_idle_keeps_the_cpu() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();
    hart.pc = 0x2000;

    for _ in 0..1000 {
        tick(&mut k, &mut hart);
        assert_eq!(k.current(), Some(a));
    }
    assert_eq!(hart.pc, 0x2000);
    assert_eq!(k.machine().compare(), 1001 * PERIOD);
    assert_consistent(&k);
}

#[test]
fn equal_priorities_take_turns_on_each_tick() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0xA, MIN_STACK_WORDS, 1).unwrap();
    let b = k.create_task("b", spin, 0xB, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();

    let mut seen = vec![k.current().unwrap()];
    for _ in 0..5 {
        tick(&mut k, &mut hart);
        assert_consistent(&k);
        seen.push(k.current().unwrap());
    }
    assert_eq!(seen, [a, b, a, b, a, b]);
    assert_eq!(hart.regs.x[GeneralRegs::A0], 0xB);
}

#[test]
fn more_urgent_task_preempts_and_keeps_the_cpu() {
    let mut k = kernel();
    let low = k.create_task("low", spin, 1, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();
    assert_eq!(k.current(), Some(low));

    let high = k.create_task("high", spin, 3, MIN_STACK_WORDS, 3).unwrap();
    assert!(k.outranks_current(high));
    hart.yield_now(&mut k).unwrap();
    assert_eq!(k.current(), Some(high));
    assert_eq!(hart.regs.x[GeneralRegs::A0], 3);

    for _ in 0..20 {
        tick(&mut k, &mut hart);
        assert_eq!(k.current(), Some(high));
        assert_eq!(status(&k, low), TaskStatus::Ready);
    }
    assert_consistent(&k);
}

#[test]
fn yield_without_peer_resumes_after_the_ecall() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();
    hart.pc = 0x4000;
    hart.regs.x[9] = 0x5151;

    hart.yield_now(&mut k).unwrap();
    assert_eq!(k.current(), Some(a));
    assert_eq!(hart.pc, 0x4004);
    assert_eq!(hart.regs.x[9], 0x5151);

    hart.yield_now(&mut k).unwrap();
    assert_eq!(hart.pc, 0x4008);
    assert_eq!(k.ticks(), 0);
}

#[test]
fn yield_hands_over_to_equal_priority_peer() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 2).unwrap();
    let b = k.create_task("b", spin, 0, MIN_STACK_WORDS, 2).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();
    hart.pc = 0x100;

    hart.yield_now(&mut k).unwrap();
    assert_eq!(k.current(), Some(b));
    hart.yield_now(&mut k).unwrap();
    assert_eq!(k.current(), Some(a));
    assert_eq!(hart.pc, 0x104);
}

#[test]
fn registers_survive_a_round_trip_through_another_task() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let _b = k.create_task("b", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();

    for (i, r) in hart.regs.x.iter_mut().enumerate() {
        *r = 0x7000_0000 + i;
    }
    hart.pc = 0x1234;
    let saved = hart.regs;

    tick(&mut k, &mut hart);
    assert_ne!(k.current(), Some(a));
    hart.regs.x.iter_mut().for_each(|r| *r = 0xDEAD);
    tick(&mut k, &mut hart);

    assert_eq!(k.current(), Some(a));
    assert_eq!(hart.pc, 0x1234);
    assert_eq!(hart.regs.x[GeneralRegs::RA], saved.x[GeneralRegs::RA]);
    assert_eq!(hart.regs.x[5..], saved.x[5..]);
}

#[test]
fn blocked_task_is_skipped_until_unblocked() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 2).unwrap();
    let b = k.create_task("b", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();
    assert_eq!(k.current(), Some(a));

    assert!(k.block(a));
    hart.yield_now(&mut k).unwrap();
    assert_eq!(k.current(), Some(b));
    assert_eq!(status(&k, a), TaskStatus::Blocked);
    assert_consistent(&k);

    for _ in 0..10 {
        tick(&mut k, &mut hart);
        assert_eq!(k.current(), Some(b));
    }

    assert!(k.unblock(a));
    hart.yield_now(&mut k).unwrap();
    assert_eq!(k.current(), Some(a));
    assert_consistent(&k);
}

#[test]
fn block_request_after_wakeup_keeps_the_slice() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let b = k.create_task("b", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();
    hart.pc = 0x300;

    // the tick lands between the state change and the ecall
    assert!(k.block(a));
    tick(&mut k, &mut hart);
    assert_eq!(k.current(), Some(b));

    assert!(!k.unblock(a));
    tick(&mut k, &mut hart);
    assert_eq!(k.current(), Some(a));
    assert_eq!(hart.pc, 0x300);

    hart.request(&mut k, YieldRequest::Block).unwrap();
    assert_eq!(k.current(), Some(a));
    assert_eq!(hart.pc, 0x304);
    assert_eq!(status(&k, b), TaskStatus::Ready);
    assert_consistent(&k);

    // a plain yield at the same point still hands over
    hart.yield_now(&mut k).unwrap();
    assert_eq!(k.current(), Some(b));
}

#[test]
fn block_request_switches_while_blocked() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 2).unwrap();
    let b = k.create_task("b", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();

    assert!(k.block(a));
    hart.request(&mut k, YieldRequest::Block).unwrap();
    assert_eq!(k.current(), Some(b));
    assert_eq!(status(&k, a), TaskStatus::Blocked);
    assert_consistent(&k);
}

#[test]
fn preempt_request_needs_a_strictly_more_urgent_task() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let _b = k.create_task("b", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();
    hart.pc = 0x500;

    hart.request(&mut k, YieldRequest::Preempt).unwrap();
    assert_eq!(k.current(), Some(a));
    assert_eq!(hart.pc, 0x504);

    let c = k.create_task("c", spin, 0, MIN_STACK_WORDS, 2).unwrap();
    hart.request(&mut k, YieldRequest::Preempt).unwrap();
    assert_eq!(k.current(), Some(c));
    assert_consistent(&k);
}

#[test]
fn unknown_request_code_acts_as_yield() {
    let mut k = kernel();
    let _a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let b = k.create_task("b", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();

    hart.regs.x[GeneralRegs::A7] = 0x77;
    hart.trap(&mut k, rtcore::trap::Exception::MachineEnvCall as usize).unwrap();
    assert_eq!(k.current(), Some(b));
}

static TICK_HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

fn count_tick() {
    TICK_HOOK_CALLS.fetch_add(1, Ordering::Relaxed);
}

#[test]
fn tick_hook_runs_once_per_tick() {
    let config = KernelConfig {
        tick_period: PERIOD,
        tick_hook: Some(count_tick),
        ..KernelConfig::DEFAULT
    };
    let mut k = Box::new(Kernel::new(StubMachine::new(), config));
    let mut hart = StubHart::boot(&mut k).unwrap();

    for _ in 0..7 {
        tick(&mut k, &mut hart);
    }
    hart.yield_now(&mut k).unwrap();
    assert_eq!(TICK_HOOK_CALLS.load(Ordering::Relaxed), 7);
    assert_eq!(k.ticks(), 7);
}

#[test]
fn all_user_tasks_blocked_falls_back_to_idle() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();

    k.block(a);
    tick(&mut k, &mut hart);
    assert_eq!(k.current(), k.idle_task());

    k.unblock(a);
    tick(&mut k, &mut hart);
    assert_eq!(k.current(), Some(a));
}

#[test]
fn missed_ticks_rebase_the_deadline() {
    let mut k = kernel();
    let mut hart = StubHart::boot(&mut k).unwrap();
    assert_eq!(k.machine().compare(), PERIOD);

    k.machine_mut().advance(3 * PERIOD + 50);
    hart.tick(&mut k).unwrap();
    assert_eq!(k.machine().compare(), 3 * PERIOD + 50 + PERIOD);
    assert!(!k.machine().timer_pending());
    assert_eq!(k.ticks(), 1);
}

#[test]
fn tick_deadline_crosses_the_low_half_cleanly() {
    let mut k = kernel();
    k.machine_mut().set_time(0xFFFF_FFC0);
    let mut hart = StubHart::boot(&mut k).unwrap();
    assert_eq!(k.machine().compare(), 0x1_0000_0024);
    assert_eq!(k.machine().transient_matches(), 0);

    k.machine_mut().clear_compare_writes();
    tick(&mut k, &mut hart);
    assert_eq!(k.machine().compare(), 0x1_0000_0088);
    assert_eq!(k.machine().transient_matches(), 0);
    assert_eq!(k.read_time(), 0x1_0000_0024);
}

#[test]
fn stack_high_water_mark_stays_above_the_guard() {
    let mut k = kernel();
    let a = k.create_task("a", spin, 0, MIN_STACK_WORDS, 1).unwrap();
    let mut hart = StubHart::boot(&mut k).unwrap();
    let before = k.stack_high_water_mark(a).unwrap();

    for _ in 0..5 {
        tick(&mut k, &mut hart);
    }
    let after = k.stack_high_water_mark(a).unwrap();
    assert_eq!(before, after);
    assert!(after >= rtcore::config::STACK_GUARD_WORDS);
    assert!(after < MIN_STACK_WORDS);
}

#[test]
fn critical_section_nests_on_the_kernel() {
    let mut k = kernel();
    k.critical_enter();
    k.critical_enter();
    assert_eq!(k.critical_depth(), 2);
    assert!(!k.machine().interrupts_enabled());

    k.critical_exit();
    assert!(!k.machine().interrupts_enabled());
    k.critical_exit();
    assert!(k.machine().interrupts_enabled());

    k.critical_exit();
    assert_eq!(k.critical_depth(), 0);
    assert_eq!(k.machine().enable_count(), 1);
}
