use crate::task::stack::{StackPtr, StackRegion};

/// Entry point of a task, receives the creation argument in `a0`
pub type TaskEntry = extern "C" fn(usize) -> !;

/// Stable reference to a slot of the task pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u8);

impl TaskHandle {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u8)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Ready,
    Running,
    Blocked,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskControlBlock {
    pub name: &'static str,
    /// higher is more urgent
    pub priority: u8,
    pub task_status: TaskStatus,
    /// where the saved trap frame begins
    pub sp: StackPtr,
    pub stack: StackRegion,
}

impl TaskControlBlock {
    pub fn is_ready(&self) -> bool {
        self.task_status == TaskStatus::Ready
    }

    pub fn is_running(&self) -> bool {
        self.task_status == TaskStatus::Running
    }
}
