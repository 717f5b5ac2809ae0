#![allow(dead_code)]

use rtcore::hal::{StubHart, StubMachine};
use rtcore::task::{Kernel, KernelConfig, TaskHandle, TaskStatus};

pub const PERIOD: u64 = 100;

pub extern "C" fn spin(_: usize) -> ! {
    loop {
        core::hint::spin_loop();
    }
}

pub fn kernel() -> Box<Kernel<StubMachine>> {
    Box::new(Kernel::new(StubMachine::new(), KernelConfig { tick_period: PERIOD, ..KernelConfig::DEFAULT }))
}

/// Let one tick period elapse and take the timer interrupt
pub fn tick(k: &mut Kernel<StubMachine>, hart: &mut StubHart) {
    k.machine_mut().advance(PERIOD);
    hart.tick(k).unwrap();
}

pub fn status(k: &Kernel<StubMachine>, task: TaskHandle) -> TaskStatus {
    k.task(task).unwrap().task_status
}

/// Exactly one task runs, it is `current` and it is not queued; the ready
/// set holds exactly the `Ready` tasks
pub fn assert_consistent(k: &Kernel<StubMachine>) {
    let running: Vec<_> = k
        .tasks()
        .filter(|(_, t)| t.task_status == TaskStatus::Running)
        .map(|(h, _)| h)
        .collect();
    assert_eq!(running.len(), 1);
    assert_eq!(k.current(), Some(running[0]));
    assert!(!k.ready_set().contains(running[0]));
    for (h, t) in k.tasks() {
        assert_eq!(k.ready_set().contains(h), t.task_status == TaskStatus::Ready);
    }
}
