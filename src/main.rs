#![no_std]
#![no_main]

#[macro_use]
extern crate rtcore;

use rtcore::config::MIN_STACK_WORDS;
use rtcore::hal;
use rtcore::sync::{CriticalSection, UPSafeCellRaw};
use rtcore::task::{self, TaskHandle};
use rtcore::timer::ms_to_ticks;

const WORKER_STACK_WORDS: usize = MIN_STACK_WORDS * 2;
const WORKER_PRIORITY: u8 = 2;
const MONITOR_PRIORITY: u8 = 3;
const REPORT_EVERY: usize = 200_000;
const REPORT_MS: u64 = 500;

static MONITOR: UPSafeCellRaw<Option<TaskHandle>> = unsafe { UPSafeCellRaw::new(None) };

/// Two of these share a priority level and are time-sliced by the tick
extern "C" fn worker(id: usize) -> ! {
    let mut rounds: usize = 0;
    loop {
        rounds = rounds.wrapping_add(1);
        if rounds % REPORT_EVERY == 0 {
            {
                let _guard = CriticalSection::enter();
                println!("[worker {}] round {}", id, rounds);
            }
            if let Some(monitor) = *MONITOR.get_mut() {
                task::unblock(monitor);
            }
        }
    }
}

/// Sleeps until a worker wakes it, preempts the workers, and reports at
/// most once per `REPORT_MS`
extern "C" fn monitor(_: usize) -> ! {
    let mut last_report = 0;
    loop {
        task::block_current();
        let now = task::tick_count();
        if now.wrapping_sub(last_report) < ms_to_ticks(REPORT_MS) {
            continue;
        }
        last_report = now;
        let Some(me) = task::current_task() else {
            continue;
        };
        let _guard = CriticalSection::enter();
        println!(
            "[monitor] tick {} free stack words {:?}",
            now,
            task::stack_high_water_mark(me)
        );
    }
}

#[no_mangle]
pub fn rust_main() -> ! {
    hal::bootstrap_init();
    rtcore::console::init();
    println!("[kernel] rtcore booting");
    hal::machine_init();

    for id in 0..2 {
        if let Err(err) = task::create_task("worker", worker, id, WORKER_STACK_WORDS, WORKER_PRIORITY) {
            log::error!("[kernel] cannot create worker {}: {}", id, err);
            hal::halt();
        }
    }
    match task::create_task("monitor", monitor, 0, WORKER_STACK_WORDS, MONITOR_PRIORITY) {
        Ok(handle) => *MONITOR.get_mut() = Some(handle),
        Err(err) => {
            log::error!("[kernel] cannot create monitor: {}", err);
            hal::halt();
        }
    }

    println!("[kernel] starting scheduler");
    task::start_scheduler()
}
